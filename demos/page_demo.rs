//! Demo: build and print one page of a small translation comparison
use anyhow::Result;
use seqview::{
    report::PageReport, DataSource, ModelOutputs, PageRequest, PageView, ScoreError, ScoreLevel,
    ScoreOutput, Scorer, ScorerRegistry, SortingType,
};
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

/// Unigram precision against the first reference
struct UnigramPrecision;

impl Scorer for UnigramPrecision {
    #[allow(clippy::cast_precision_loss)]
    fn score(
        &self,
        hypotheses: &[String],
        references: &[Vec<String>],
        _level: ScoreLevel,
    ) -> Result<ScoreOutput, ScoreError> {
        let first = references.first().map_or(&[][..], Vec::as_slice);
        let sent_scores = hypotheses
            .iter()
            .zip(first)
            .map(|(h, r)| {
                let reference: HashSet<&str> = r.split_whitespace().collect();
                let tokens: Vec<&str> = h.split_whitespace().collect();
                if tokens.is_empty() {
                    return 0.0;
                }
                let hits = tokens.iter().filter(|t| reference.contains(*t)).count();
                hits as f64 / tokens.len() as f64
            })
            .collect();
        Ok(ScoreOutput {
            corpus_score: None,
            sent_scores,
        })
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let src = DataSource::from_texts(
        "fr",
        to_strings(&[
            "le chat dort sur le canapé",
            "il pleut depuis ce matin",
            "nous partons demain à l'aube",
            "merci pour votre aide",
            "la réunion est annulée",
        ]),
    );
    let reference = DataSource::from_texts(
        "en",
        to_strings(&[
            "the cat is sleeping on the couch",
            "it has been raining since this morning",
            "we leave tomorrow at dawn",
            "thank you for your help",
            "the meeting is cancelled",
        ]),
    );
    let hypo = ModelOutputs::new(vec![
        (
            "transformer",
            to_strings(&[
                "the cat sleeps on the couch",
                "it has rained since this morning",
                "we leave tomorrow at dawn",
                "thanks for your help",
                "the meeting is cancelled",
            ]),
        ),
        (
            "rnn",
            to_strings(&[
                "cat sleep sofa",
                "rain this morning",
                "we go tomorrow",
                "thank you for your help",
                "meeting cancel",
            ]),
        ),
    ])?;

    let view = PageView::new(ScorerRegistry::new().with("unigram", UnigramPrecision));
    let request = PageRequest::default()
        .page(3, 1)
        .with_metrics(["unigram"])
        .sorted_by(SortingType::MetricDiff, "unigram");

    let page = view.get(&request, &src, &reference, &hypo)?;
    let report = PageReport::new("fr-en: largest model disagreement first", &request, page);

    println!("{}", report.to_text());
    println!("{}", report.to_json()?);

    Ok(())
}
