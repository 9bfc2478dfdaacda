//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the estimator and solver code stays clean and testable
//! - output changes are localized

use nalgebra::DVector;

use crate::domain::ScoreMetric;
use crate::fit::{CvResult, FittedGlm};
use crate::math::LinkPoint;
use crate::report::PathRow;

/// Side-by-side table of the linearized and exact exponential.
pub fn format_link_table(points: &[LinkPoint], eta: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!("Linearized exp vs exp (eta = {eta:.3})\n"));
    out.push_str(&format!("{:>10} {:>16} {:>16} {:>6}\n", "z", "linearized", "exp", "branch"));
    out.push_str(&format!("{:-<10} {:-<16} {:-<16} {:-<6}\n", "", "", "", ""));
    for p in points {
        let branch = if p.z <= eta { "exp" } else { "linear" };
        out.push_str(&format!(
            "{:>10.4} {:>16.4} {:>16.4} {:>6}\n",
            p.z, p.linearized, p.exact, branch
        ));
    }
    out
}

/// Per-λ path summary; `selected` is marked with `*`.
pub fn format_path_summary(rows: &[PathRow], metric: ScoreMetric, selected: usize) -> String {
    let mut out = String::new();
    out.push_str("Regularization path:\n");
    out.push_str(&format!(
        "  {:>4} {:>12} {:>8} {:>9} {:>8} {:>12}\n",
        "#", "reg_lambda", "iters", "converged", "nonzero", metric.display_name()
    ));
    for (i, r) in rows.iter().enumerate() {
        let chosen = if i == selected { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:>4} {:>12.6} {:>8} {:>9} {:>8} {:>12.6}\n",
            i,
            r.reg_lambda,
            r.n_iter,
            if r.converged { "yes" } else { "no" },
            r.n_nonzero,
            r.score
        ));
    }
    out
}

/// First `n` rows of true vs predicted targets.
pub fn format_prediction_table(y_true: &DVector<f64>, y_pred: &DVector<f64>, n: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>6} {:>12} {:>12}\n", "sample", "true", "predicted"));
    out.push_str(&format!("{:-<6} {:-<12} {:-<12}\n", "", "", ""));
    for (i, (t, p)) in y_true.iter().zip(y_pred.iter()).take(n).enumerate() {
        out.push_str(&format!("{i:>6} {t:>12.3} {p:>12.3}\n"));
    }
    out
}

/// Cross-validation table: mean and per-fold held-out scores.
pub fn format_cv_summary(cv: &CvResult, metric: ScoreMetric) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Cross-validation ({} folds, {}):\n",
        cv.fold_scores.len(),
        metric.display_name()
    ));
    for (i, (&lambda, &score)) in cv.path.reg_lambda().iter().zip(cv.scores.iter()).enumerate() {
        let chosen = if i == cv.best_index { "*" } else { " " };
        let folds: Vec<f64> = cv.fold_scores.iter().map(|f| f[i]).collect();
        out.push_str(&format!(
            "{chosen} reg_lambda={lambda:<10.6} mean={score:<10.6} folds={}\n",
            fmt_vec(&folds)
        ));
    }
    out
}

/// Intercept and the non-zero coefficients of a model, largest magnitude first.
pub fn format_coefficients(model: &FittedGlm, names: &[String], max_rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Model: {} | reg_lambda={:.6} | alpha={:.3} | eta={:.3}\n",
        model.family.display_name(),
        model.reg_lambda,
        model.alpha,
        model.eta
    ));
    out.push_str(&format!("- intercept: {:.6}\n", model.beta0));
    out.push_str(&format!(
        "- non-zero coefficients: {}/{}\n",
        model.n_nonzero(),
        model.n_features()
    ));

    let mut nz: Vec<(usize, f64)> = model
        .beta
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, b)| *b != 0.0)
        .collect();
    nz.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(std::cmp::Ordering::Equal));

    for (j, b) in nz.into_iter().take(max_rows) {
        let name = names.get(j).map(String::as_str).unwrap_or("?");
        out.push_str(&format!("  {:<20} {b:>12.6}\n", truncate(name, 20)));
    }
    out
}

/// Closing block of the demo: true vs recovered sparsity and the train/test scores.
pub fn format_demo_summary(
    model: &FittedGlm,
    true_nonzero: usize,
    train_score: f64,
    test_score: f64,
    correlation: Option<f64>,
) -> String {
    let metric = model.score_metric.display_name();
    let mut out = String::new();
    out.push_str("Demo summary:\n");
    out.push_str(&format!(
        "- selected reg_lambda: {:.6} ({} iterations, {})\n",
        model.reg_lambda,
        model.n_iter,
        if model.converged { "converged" } else { "not converged" }
    ));
    out.push_str(&format!(
        "- non-zero coefficients: {} fitted / {} true\n",
        model.n_nonzero(),
        true_nonzero
    ));
    out.push_str(&format!("- train {metric}: {train_score:.6}\n"));
    out.push_str(&format!("- test {metric}: {test_score:.6}\n"));
    match correlation {
        Some(r) => out.push_str(&format!("- corr(predicted, true): {r:.4}\n")),
        None => out.push_str("- corr(predicted, true): n/a\n"),
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Family;
    use crate::math::link_curve;

    #[test]
    fn link_table_labels_branches() {
        let table = format_link_table(&link_curve(4.0, 0.0, 10.0, 3), 4.0);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[3].trim_end().ends_with("exp"));
        assert!(lines[4].trim_end().ends_with("linear"));
    }

    #[test]
    fn path_summary_marks_selected_row() {
        let rows = vec![
            PathRow { reg_lambda: 0.5, n_iter: 10, converged: true, n_nonzero: 1, score: 0.1 },
            PathRow { reg_lambda: 0.01, n_iter: 30, converged: false, n_nonzero: 4, score: 0.4 },
        ];
        let text = format_path_summary(&rows, ScoreMetric::PseudoR2, 1);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].starts_with(' '));
        assert!(lines[3].starts_with('*'));
        assert!(lines[3].contains("no"));
    }

    #[test]
    fn prediction_table_is_truncated() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let p = DVector::from_vec(vec![1.1, 1.9, 3.2]);
        assert_eq!(format_prediction_table(&y, &p, 2).lines().count(), 4);
    }

    #[test]
    fn coefficients_sorted_by_magnitude() {
        let model = FittedGlm {
            family: Family::Poisson,
            eta: 4.0,
            alpha: 0.05,
            reg_lambda: 0.01,
            beta0: 0.1,
            beta: DVector::from_vec(vec![0.2, 0.0, -0.9]),
            ynull: 1.0,
            score_metric: ScoreMetric::PseudoR2,
            n_iter: 3,
            converged: true,
        };
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let text = format_coefficients(&model, &names, 10);
        let c = text.find("  c ").unwrap();
        let a = text.find("  a ").unwrap();
        assert!(c < a);
        assert!(text.contains("2/3"));
        assert!(!text.contains("  b "));
    }

    #[test]
    fn demo_summary_reports_missing_correlation() {
        let model = FittedGlm {
            family: Family::Poisson,
            eta: 4.0,
            alpha: 0.05,
            reg_lambda: 0.01,
            beta0: 0.0,
            beta: DVector::from_vec(vec![0.0, 0.4]),
            ynull: 1.0,
            score_metric: ScoreMetric::PseudoR2,
            n_iter: 7,
            converged: false,
        };
        let text = format_demo_summary(&model, 3, 0.4, 0.35, None);
        assert!(text.contains("1 fitted / 3 true"));
        assert!(text.contains("not converged"));
        assert!(text.contains("test pseudo-R2: 0.350000"));
        assert!(text.contains("n/a"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_rather_long_name", 6), "a_rat.");
    }
}
