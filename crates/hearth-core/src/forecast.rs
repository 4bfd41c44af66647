//! Expense forecasting
//!
//! One regression ensemble per target (total, essential, discretionary)
//! is fitted on the lag/rolling features of the monthly series. The next
//! month is predicted directly; the next week is derived from the monthly
//! prediction with a fixed four-week profile.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ForecastSettings, RecommenderConfig};
use crate::error::{Error, Result};
use crate::features::{build_features, next_month, next_month_features, FeatureRow, FEATURE_NAMES};
use crate::ml::{mean_absolute_error, r2_score, ForestParams, RandomForestRegressor, StandardScaler};
use crate::models::{
    Forecast, Horizon, MonthForecast, MonthlyAggregate, Prediction, WeekForecast, WeeklyBreakdown,
};

/// Essentials are spread evenly across the month
const ESSENTIAL_WEEK_WEIGHTS: [f64; 4] = [0.25, 0.25, 0.25, 0.25];

/// Discretionary spend picks up towards month end
const DISCRETIONARY_WEEK_WEIGHTS: [f64; 4] = [0.23, 0.24, 0.24, 0.29];

/// Quantity a model is trained to predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastTarget {
    TotalExpenses,
    EssentialExpenses,
    DiscretionaryExpenses,
}

impl ForecastTarget {
    pub const ALL: [ForecastTarget; 3] = [
        Self::TotalExpenses,
        Self::EssentialExpenses,
        Self::DiscretionaryExpenses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalExpenses => "total_expenses",
            Self::EssentialExpenses => "essential_expenses",
            Self::DiscretionaryExpenses => "discretionary_expenses",
        }
    }

    /// Observed value of this target for a month
    pub fn value(&self, month: &MonthlyAggregate) -> f64 {
        match self {
            Self::TotalExpenses => month.total_expenses,
            Self::EssentialExpenses => month.essential_expenses,
            Self::DiscretionaryExpenses => month.non_essential_expenses,
        }
    }
}

impl std::fmt::Display for ForecastTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fitted model for one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedTarget {
    pub model: RandomForestRegressor,
    pub scaler: StandardScaler,
    /// Feature names in the order the model was fitted on
    pub features: Vec<String>,
    /// Held-out R² (0 when the held-out targets are constant)
    pub r2_score: f64,
    /// Held-out mean absolute error; used as the prediction band
    pub mae: f64,
}

impl TrainedTarget {
    /// Raw model output for one feature row
    pub fn predict(&self, row: &FeatureRow) -> Result<f64> {
        let values = self
            .features
            .iter()
            .map(|name| {
                row.get(name)
                    .ok_or_else(|| Error::InvalidArgument(format!("unknown feature '{}'", name)))
            })
            .collect::<Result<Vec<f64>>>()?;
        let scaled = self.scaler.transform_row(&values)?;
        self.model.predict_row(&scaled)
    }
}

pub type TrainedModels = BTreeMap<ForecastTarget, TrainedTarget>;

impl From<&ForecastSettings> for ForestParams {
    fn from(settings: &ForecastSettings) -> Self {
        Self {
            n_estimators: settings.n_estimators,
            seed: settings.seed,
            max_depth: settings.max_depth,
            ..Default::default()
        }
    }
}

/// Shuffle row indices with `seed` and hold out `ceil(n * test_fraction)`
///
/// Returns (train, test), each in ascending order. At least one row stays
/// on each side.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n.saturating_sub(1).max(1));
    let mut test = indices[..n_test].to_vec();
    let mut train = indices[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

fn select<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Fit one model per target on the monthly series
///
/// With fewer than `min_rows_for_split` months the full series is used for
/// both fitting and evaluation.
pub fn train(monthly: &[MonthlyAggregate], config: &RecommenderConfig) -> Result<TrainedModels> {
    if monthly.is_empty() {
        return Err(Error::NoData("no monthly data to train on".into()));
    }
    let settings = &config.forecast;
    if monthly.len() < config.min_months_for_training {
        warn!(
            "Only {} months of data available for training; forecast accuracy may be lower",
            monthly.len()
        );
    }

    let x: Vec<Vec<f64>> = build_features(monthly).iter().map(FeatureRow::to_vec).collect();
    let n = x.len();
    let (train_idx, test_idx) = if n >= settings.min_rows_for_split.max(2) {
        split_indices(n, settings.test_fraction, settings.seed)
    } else {
        debug!("{} months; evaluating on the training rows", n);
        ((0..n).collect(), (0..n).collect())
    };

    let x_train = select(&x, &train_idx);
    let x_test = select(&x, &test_idx);

    let mut models = TrainedModels::new();
    for target in ForecastTarget::ALL {
        let y: Vec<f64> = monthly.iter().map(|m| target.value(m)).collect();
        let y_train = select(&y, &train_idx);
        let y_test = select(&y, &test_idx);

        let scaler = StandardScaler::fit(&x_train)?;
        let mut model = RandomForestRegressor::new(ForestParams::from(settings));
        model.fit(&scaler.transform(&x_train)?, &y_train)?;

        let predictions = model.predict(&scaler.transform(&x_test)?)?;
        let r2 = r2_score(&y_test, &predictions);
        let mae = mean_absolute_error(&y_test, &predictions);
        info!("{}: R²={:.3}, MAE={:.2}", target, r2, mae);

        models.insert(
            target,
            TrainedTarget {
                model,
                scaler,
                features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                r2_score: r2,
                mae,
            },
        );
    }

    Ok(models)
}

/// Forecast the next month or week after the latest month in the series
pub fn predict(
    models: &TrainedModels,
    monthly: &[MonthlyAggregate],
    horizon: Horizon,
) -> Result<Forecast> {
    if models.is_empty() {
        return Err(Error::ModelNotTrained(
            "call build_predictive_models() first".into(),
        ));
    }
    let (Some(last), Some(row)) = (monthly.last(), next_month_features(monthly)) else {
        return Err(Error::NoData("no monthly data loaded".into()));
    };

    let predict_target = |target: ForecastTarget| -> Result<Prediction> {
        match models.get(&target) {
            Some(trained) => Ok(Prediction::with_error(trained.predict(&row)?, trained.mae)),
            None => {
                debug!("No model for {}; using last observed value", target);
                Ok(Prediction::with_error(target.value(last), 0.0))
            }
        }
    };

    let month = MonthForecast {
        month_num: next_month(last.month_num),
        total: predict_target(ForecastTarget::TotalExpenses)?,
        essential: predict_target(ForecastTarget::EssentialExpenses)?,
        discretionary: predict_target(ForecastTarget::DiscretionaryExpenses)?,
    };

    Ok(match horizon {
        Horizon::Month => Forecast::Month(month),
        Horizon::Week => Forecast::Week(week_forecast(&month)),
    })
}

/// Weights scaled to sum to 1 (uniform if they sum to 0)
pub fn normalize_weights(weights: [f64; 4]) -> [f64; 4] {
    let sum: f64 = weights.iter().sum();
    if sum > 0.0 {
        weights.map(|w| w / sum)
    } else {
        [0.25; 4]
    }
}

fn spread(amount: f64, weights: &[f64; 4]) -> [f64; 4] {
    weights.map(|w| amount * w)
}

fn add(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]]
}

/// Profile a monthly forecast over four weeks
pub fn week_forecast(month: &MonthForecast) -> WeekForecast {
    let w_ess = normalize_weights(ESSENTIAL_WEEK_WEIGHTS);
    let w_disc = normalize_weights(DISCRETIONARY_WEEK_WEIGHTS);

    let essential = spread(month.essential.point, &w_ess);
    let discretionary = spread(month.discretionary.point, &w_disc);
    let total = add(essential, discretionary);
    let total_low = add(
        spread(month.essential.low, &w_ess),
        spread(month.discretionary.low, &w_disc),
    );
    let total_high = add(
        spread(month.essential.high, &w_ess),
        spread(month.discretionary.high, &w_disc),
    );

    WeekForecast {
        estimated: true,
        predicted_expenses: total.iter().sum(),
        predicted_essential: essential.iter().sum(),
        predicted_discretionary: discretionary.iter().sum(),
        breakdown: WeeklyBreakdown {
            total,
            essential,
            discretionary,
            total_low,
            total_high,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(totals: &[f64]) -> Vec<MonthlyAggregate> {
        totals
            .iter()
            .enumerate()
            .map(|(i, &total)| MonthlyAggregate {
                month_num: i as u32 + 1,
                income: 100_000.0,
                categories: BTreeMap::new(),
                total_expenses: total,
                essential_expenses: total * 0.6,
                non_essential_expenses: total * 0.4,
                essential_ratio: 0.6,
                discretionary_ratio: 0.4,
            })
            .collect()
    }

    fn small_config() -> RecommenderConfig {
        let mut config = RecommenderConfig::default();
        config.forecast.n_estimators = 20;
        config
    }

    #[test]
    fn test_split_indices() {
        let (train, test) = split_indices(8, 0.25, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 6);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..8).collect::<Vec<_>>());

        assert_eq!(split_indices(8, 0.25, 42), (train, test));
        // 5 * 0.25 rounds up
        assert_eq!(split_indices(5, 0.25, 1).1.len(), 2);
    }

    #[test]
    fn test_train_all_targets() {
        let monthly = series(&[70_000.0, 72_000.0, 69_000.0, 75_000.0, 74_000.0, 76_000.0]);
        let models = train(&monthly, &small_config()).unwrap();

        assert_eq!(models.len(), 3);
        for target in ForecastTarget::ALL {
            let trained = &models[&target];
            assert_eq!(trained.features, FEATURE_NAMES.to_vec());
            assert!(trained.mae >= 0.0);
            assert!(trained.model.is_fitted());
        }
    }

    #[test]
    fn test_short_history_evaluates_on_training_rows() {
        let monthly = series(&[50_000.0, 50_000.0]);
        let models = train(&monthly, &small_config()).unwrap();
        let total = &models[&ForecastTarget::TotalExpenses];
        // constant targets: R² undefined -> 0, perfect fit
        assert_eq!(total.r2_score, 0.0);
        assert_eq!(total.mae, 0.0);
    }

    #[test]
    fn test_train_empty() {
        assert!(matches!(
            train(&[], &small_config()),
            Err(Error::NoData(_))
        ));
    }

    #[test]
    fn test_predict_month_wraps_and_bands() {
        let mut monthly = series(&[60_000.0, 61_000.0, 62_000.0]);
        for (m, num) in monthly.iter_mut().zip([10, 11, 12]) {
            m.month_num = num;
        }
        let models = train(&monthly, &small_config()).unwrap();

        let forecast = predict(&models, &monthly, Horizon::Month).unwrap();
        let Forecast::Month(month) = forecast else {
            panic!("expected month forecast");
        };
        assert_eq!(month.month_num, 1);
        assert!(month.total.low <= month.total.point);
        assert!(month.total.point <= month.total.high);
        assert!(month.total.low >= 0.0);
    }

    #[test]
    fn test_predict_week_sums() {
        let monthly = series(&[40_000.0, 44_000.0, 42_000.0, 46_000.0]);
        let models = train(&monthly, &small_config()).unwrap();

        let Forecast::Week(week) = predict(&models, &monthly, Horizon::Week).unwrap() else {
            panic!("expected week forecast");
        };
        assert!(week.estimated);
        let sum: f64 = week.breakdown.total.iter().sum();
        assert!((sum - week.predicted_expenses).abs() < 1e-6);
        for i in 0..4 {
            assert!(week.breakdown.total_low[i] <= week.breakdown.total[i] + 1e-9);
            assert!(week.breakdown.total[i] <= week.breakdown.total_high[i] + 1e-9);
        }
    }

    #[test]
    fn test_week_profile() {
        let month = MonthForecast {
            month_num: 2,
            total: Prediction::with_error(1000.0, 0.0),
            essential: Prediction::with_error(400.0, 0.0),
            discretionary: Prediction::with_error(600.0, 0.0),
        };
        let week = week_forecast(&month);
        assert_eq!(week.breakdown.essential, [100.0; 4]);
        assert!((week.breakdown.discretionary[3] - 174.0).abs() < 1e-9);
        assert!((week.predicted_expenses - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_normalized() {
        for weights in [ESSENTIAL_WEEK_WEIGHTS, DISCRETIONARY_WEEK_WEIGHTS, [2.0, 2.0, 4.0, 0.0]] {
            let sum: f64 = normalize_weights(weights).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
        assert_eq!(normalize_weights([0.0; 4]), [0.25; 4]);
    }

    #[test]
    fn test_predict_errors() {
        let monthly = series(&[1.0, 2.0]);
        assert!(matches!(
            predict(&TrainedModels::new(), &monthly, Horizon::Month),
            Err(Error::ModelNotTrained(_))
        ));

        let models = train(&monthly, &small_config()).unwrap();
        assert!(matches!(
            predict(&models, &[], Horizon::Month),
            Err(Error::NoData(_))
        ));
    }

    #[test]
    fn test_missing_target_uses_last_value() {
        let monthly = series(&[10_000.0, 20_000.0, 30_000.0]);
        let mut models = train(&monthly, &small_config()).unwrap();
        models.remove(&ForecastTarget::EssentialExpenses);

        let Forecast::Month(month) = predict(&models, &monthly, Horizon::Month).unwrap() else {
            panic!("expected month forecast");
        };
        assert!((month.essential.point - 18_000.0).abs() < 1e-6);
        assert_eq!(month.essential.low, month.essential.high);
    }
}
