use clap::Parser;

use spam_detector::config::TrainConfig;
use spam_detector::dataset;
use spam_detector::logging;
use spam_detector::pipeline::Pipeline;
use spam_detector::types::Label;

fn main() -> anyhow::Result<()> {
    let config = TrainConfig::parse();
    logging::init(&config.log_level);

    let (texts, targets) = dataset::training_set();
    tracing::info!(samples = texts.len(), alpha = config.alpha, "Training spam classifier");

    let pipeline = Pipeline::fit(&texts, &targets, config.alpha)?;
    tracing::info!(
        vocabulary = pipeline.vocabulary().len(),
        classes = ?pipeline.classes(),
        "Pipeline fitted"
    );

    let predictions = pipeline.predict(&texts)?;
    let probabilities = pipeline.predict_proba(&texts)?;
    for (((text, &target), predicted), proba) in texts
        .iter()
        .zip(&targets)
        .zip(&predictions)
        .zip(&probabilities)
    {
        tracing::debug!(
            text,
            expected = %Label::from_class(target),
            %predicted,
            ?proba,
            "Training sample"
        );
    }
    let correct = predictions
        .iter()
        .zip(&targets)
        .filter(|&(predicted, &target)| *predicted == Label::from_class(target))
        .count();
    tracing::info!(correct, total = texts.len(), "Training set accuracy");

    pipeline.save(&config.output)?;
    tracing::info!("Model saved to {}", config.output.display());
    Ok(())
}
