//! Model training command

use std::path::Path;

use anyhow::{Context, Result};

use super::{open_session, GlobalOptions};

pub fn cmd_train(opts: &GlobalOptions, file: &Path, output: &Path) -> Result<()> {
    let mut session = open_session(opts, file)?;
    let models = session.build_predictive_models()?;

    println!("\n🧠 Trained {} models", models.len());
    for (target, model) in models {
        println!(
            "   {:<24} R² {:>6.3}   MAE {:>10.2}",
            target.to_string(),
            model.r2_score,
            model.mae
        );
    }

    session
        .save_models(output)
        .with_context(|| format!("Failed to save models to {}", output.display()))?;
    println!("\n✅ Saved models to {}", output.display());
    Ok(())
}
