// Colored terminal output for evaluation reports and predictions.
//
// This module handles all terminal-specific formatting: colors, tables,
// score highlighting. The main.rs command handlers delegate here.

use colored::Colorize;

use crate::evaluation::{ClassMetrics, ClassificationReport, EvaluationArtifacts};
use crate::predictor::PredictionResult;

/// Train F1 exceeding test F1 by more than this is highlighted.
const OVERFIT_GAP: f64 = 0.15;

/// Display a classification report as a per-label table with averages.
pub fn display_report(title: &str, report: &ClassificationReport) {
    println!("\n{}", format!("=== {title} ===").bold());
    println!();

    let width = report
        .per_class
        .iter()
        .map(|m| m.label.chars().count())
        .max()
        .unwrap_or(0)
        .max(12);

    println!(
        "  {:<width$}  {:>9}  {:>6}  {:>8}  {:>7}",
        "Label".dimmed(),
        "Precision".dimmed(),
        "Recall".dimmed(),
        "F1".dimmed(),
        "Support".dimmed(),
    );
    println!("  {}", "-".repeat(width + 40).dimmed());

    for row in &report.per_class {
        print_metrics_row(&row.label, &row.metrics, width);
    }

    println!("  {}", "-".repeat(width + 40).dimmed());
    print_metrics_row("micro avg", &report.micro_avg, width);
    print_metrics_row("macro avg", &report.macro_avg, width);
    print_metrics_row("weighted avg", &report.weighted_avg, width);
    print_metrics_row("samples avg", &report.samples_avg, width);
    println!();
}

fn print_metrics_row(label: &str, metrics: &ClassMetrics, width: usize) {
    println!(
        "  {:<width$}  {:>9.3}  {:>6.3}  {:>8}  {:>7}",
        label,
        metrics.precision,
        metrics.recall,
        colorize_score(metrics.f1_score),
        metrics.support,
    );
}

/// Summarize a training run: rows per split, train/test F1 per label and AUC.
pub fn display_evaluation_summary(evaluation: &EvaluationArtifacts) {
    println!(
        "\n{}",
        format!(
            "=== Training Summary ({} train / {} test rows, {} labels) ===",
            evaluation.split.train,
            evaluation.split.test,
            evaluation.class_names.len()
        )
        .bold()
    );
    println!();

    println!(
        "  {:<28} {:>8}  {:>8}  {:>6}  {:>6}",
        "Label".dimmed(),
        "Train F1".dimmed(),
        "Test F1".dimmed(),
        "Gap".dimmed(),
        "AUC".dimmed(),
    );
    println!("  {}", "-".repeat(64).dimmed());

    for (label, gap) in evaluation.f1_gaps() {
        let train_f1 = evaluation.train_report.get(&label).map_or(0.0, |m| m.f1_score);
        let test_f1 = evaluation.test_report.get(&label).map_or(0.0, |m| m.f1_score);

        let gap_str = format!("{gap:+.2}");
        let gap_str = if gap > OVERFIT_GAP {
            gap_str.yellow()
        } else {
            gap_str.normal()
        };

        let curves = evaluation.curves_for(&label);
        let auc_str = match curves.and_then(|c| c.auc) {
            Some(auc) => format!("{auc:.3}").normal(),
            None => "n/a".dimmed(),
        };

        println!(
            "  {:<28} {:>8.3}  {:>8}  {:>6}  {:>6}",
            super::truncate_chars(&label, 28),
            train_f1,
            colorize_score(test_f1),
            gap_str,
            auc_str,
        );
        if let Some(reason) = curves.and_then(|c| c.undefined) {
            println!("    {}", format!("curves undefined: {reason}").dimmed());
        }
    }

    println!();
    println!(
        "  Test micro F1: {:.3}  |  macro F1: {:.3}",
        evaluation.test_report.micro_avg.f1_score, evaluation.test_report.macro_avg.f1_score
    );
}

/// Display the labels predicted for one article.
pub fn display_prediction(title: &str, prediction: &PredictionResult) {
    println!(
        "\n{}",
        format!("=== Prediction: {} ===", super::truncate_chars(title, 60)).bold()
    );

    if prediction.labels.is_empty() {
        println!("  {}", "No label above the threshold.".dimmed());
    } else {
        for (label, confidence) in prediction.labels.iter().zip(&prediction.confidences) {
            println!("  {:<32} {}", label, colorize_score(*confidence));
        }
    }

    if prediction.is_low_confidence {
        println!(
            "\n  {} at least one label scored inside the low-confidence band; consider review",
            "~".yellow()
        );
    }
}

/// Explain why prediction is unavailable.
pub fn display_not_ready(reason: &str) {
    println!("{} Predictor not initialized", "!!".red().bold());
    println!("  {reason}");
    println!(
        "\n{}",
        "Run `medtag train` (and `medtag download-model` if needed) first.".dimmed()
    );
}

/// Colorize a score in [0, 1].
fn colorize_score(score: f64) -> colored::ColoredString {
    let text = format!("{score:.3}");
    if score >= 0.8 {
        text.green()
    } else if score >= 0.5 {
        text.normal()
    } else if score > 0.0 {
        text.yellow()
    } else {
        text.red()
    }
}
