//! Forecast command

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hearth_core::allocate::format_amount;
use hearth_core::{BudgetSession, Forecast, Horizon, Prediction};

use super::{load_config, load_file, GlobalOptions};

pub fn cmd_forecast(
    opts: &GlobalOptions,
    file: &Path,
    model: Option<&Path>,
    horizon: &str,
) -> Result<()> {
    let horizon: Horizon = horizon.parse()?;
    let forecast = run_forecast(opts, file, model, horizon)?;
    print!("{}", render_forecast(&forecast));
    Ok(())
}

/// Load (or train) models, then predict
///
/// A saved artifact brings its own config, so it is loaded before the CSV.
pub fn run_forecast(
    opts: &GlobalOptions,
    file: &Path,
    model: Option<&Path>,
    horizon: Horizon,
) -> Result<Forecast> {
    let mut session = BudgetSession::new(load_config(opts)?, opts.mode());
    match model {
        Some(path) => {
            session
                .load_models(path)
                .with_context(|| format!("Failed to load models from {}", path.display()))?;
            load_file(&mut session, file)?;
        }
        None => {
            load_file(&mut session, file)?;
            session.build_predictive_models()?;
        }
    }
    Ok(session.predict(horizon)?)
}

fn band(p: &Prediction) -> String {
    format!(
        "{:>12}  ({} – {})",
        format_amount(p.point),
        format_amount(p.low),
        format_amount(p.high)
    )
}

pub fn render_forecast(forecast: &Forecast) -> String {
    let mut out = String::new();
    match forecast {
        Forecast::Month(m) => {
            let _ = writeln!(out, "\n🔮 Forecast for month {}", m.month_num);
            let _ = writeln!(out, "   Total         {}", band(&m.total));
            let _ = writeln!(out, "   Essential     {}", band(&m.essential));
            let _ = writeln!(out, "   Discretionary {}", band(&m.discretionary));
        }
        Forecast::Week(w) => {
            let _ = writeln!(out, "\n🔮 Forecast for next week (estimated from the monthly model)");
            let _ = writeln!(out, "   Total         {:>12}", format_amount(w.predicted_expenses));
            let _ = writeln!(out, "   Essential     {:>12}", format_amount(w.predicted_essential));
            let _ = writeln!(
                out,
                "   Discretionary {:>12}",
                format_amount(w.predicted_discretionary)
            );
            let _ = writeln!(out, "\n   Week-by-week:");
            for (i, total) in w.breakdown.total.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "   Week {}  {:>12}  ({} – {})",
                    i + 1,
                    format_amount(*total),
                    format_amount(w.breakdown.total_low[i]),
                    format_amount(w.breakdown.total_high[i])
                );
            }
        }
    }
    out
}
