use anyhow::Context;
use onboard_core::{config::Config, db::Db, io, paths};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onboarding".to_string())
    });

    println!("Initializing onboarding project in: {}", root.display());

    let dir = paths::onboard_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to load existing config")?
    } else {
        let cfg = Config::new(&project_name);
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        cfg
    };

    let objects = config.objects_dir(root);
    io::ensure_dir(&objects).with_context(|| format!("failed to create {}", objects.display()))?;

    // Opening applies pending migrations.
    Db::open(&config.database_path(root)).context("failed to initialize database")?;
    println!("  ready:   {}", config.storage.database);

    io::ensure_gitignore_entry(root, paths::ONBOARD_DIR)
        .context("failed to update .gitignore")?;

    for w in config.validate() {
        println!("  note:    {}", w.message);
    }
    println!("\nDone. Run 'onboard serve' to start the API.");
    Ok(())
}
