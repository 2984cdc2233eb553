//! `replay`: a recorded `t_ms,raw` trace through the height estimator.
use std::path::Path;

use lift_config::{Config, load_trace_csv};
use lift_core::config::EstimatorCfg;
use lift_core::{Bounds, HeightEstimator, LiftError, PositionMapper};
use serde_json::json;

pub struct ReplayArgs<'a> {
    pub trace: &'a Path,
    pub bottom: Option<f32>,
    pub top: Option<f32>,
    pub json: bool,
}

pub fn run(cfg: &Config, args: &ReplayArgs<'_>) -> eyre::Result<()> {
    let bounds = match (args.bottom, args.top) {
        (Some(bottom), Some(top)) => Some(
            Bounds::new(bottom, top)
                .ok_or_else(|| LiftError::Config(format!("--bottom {bottom} must be below --top {top}")))?,
        ),
        _ => None,
    };

    let rows = load_trace_csv(args.trace)?;
    let est_cfg = EstimatorCfg::from(&cfg.sampling);
    let batch = est_cfg.batch_size;
    let mut est = HeightEstimator::new(est_cfg);
    let mut mapper = PositionMapper::default();
    tracing::info!(rows = rows.len(), batch, "replaying trace");

    if !args.json {
        if bounds.is_some() {
            println!("t_ms,height_mm,coarse,fine");
        } else {
            println!("t_ms,height_mm");
        }
    }

    // a trailing partial batch is filtered like a full one
    for chunk in rows.chunks(batch) {
        let raws: Vec<u16> = chunk.iter().map(|r| r.raw).collect();
        let t_ms = chunk.last().map_or(0, |r| r.t_ms);
        let height = est.push_batch(&raws);
        let steps = match (height, bounds) {
            (Some(h), Some(b)) => Some(mapper.update(h, b)),
            _ => None,
        };

        if args.json {
            let mut obj = json!({ "t_ms": t_ms, "height_mm": height });
            if let Some((coarse, fine)) = steps {
                obj["coarse"] = json!(coarse);
                obj["fine"] = json!(fine);
            }
            println!("{obj}");
        } else {
            let h = height.map_or_else(String::new, |h| format!("{h:.3}"));
            match steps {
                Some((coarse, fine)) => println!("{t_ms},{h},{coarse},{fine}"),
                None if bounds.is_some() => println!("{t_ms},{h},,"),
                None => println!("{t_ms},{h}"),
            }
        }
    }
    Ok(())
}
