mod analysis;
mod api;
mod city;
mod classify;
mod instructions;
mod normalize;
mod router;
mod screening;
mod settings;
mod web;

use std::{process::exit, sync::Arc};

use clap::Parser;
use settings::{Args, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = match Settings::from_file(&args.config) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("Problem while loading configuration. {error}");
            exit(1);
        }
    };

    let classifier = match classify::ChatClassifier::new(&settings.classifier) {
        Ok(classifier) => classifier,
        Err(error) => {
            eprintln!("Problem while creating the classifier client. {error}");
            exit(1);
        }
    };
    let router = Arc::new(router::QueryRouter::new(
        Arc::new(classifier),
        settings.router.missing_bairro,
        settings.classifier.max_retries,
    ));

    let schema = api::schema(router);
    info!(address = %settings.web.address, "listening");
    web::serve(schema, settings.web.address).await;
}
