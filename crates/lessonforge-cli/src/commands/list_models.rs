//! The `lessonforge list-models` command.

use anyhow::Result;

use lessonforge_providers::create_generator;
use lessonforge_providers::mock::MockGenerator;

use lessonforge_core::traits::TextGenerator;

use super::Paths;

pub fn execute(paths: &Paths, provider_filter: Option<String>) -> Result<()> {
    let config = paths.load_config()?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;
    for name in names {
        if provider_filter.as_ref().is_some_and(|filter| filter != name) {
            continue;
        }

        let generator = create_generator(name, &config.providers[name])?;
        print_models(name, generator.as_ref());
        found_any = true;
    }

    if !found_any {
        if provider_filter.is_some() {
            anyhow::bail!("no matching provider configured");
        }
        println!("No providers configured; chat uses offline mock responses.\n");
        print_models("mock", &MockGenerator::default());
    }

    Ok(())
}

fn print_models(name: &str, generator: &dyn TextGenerator) {
    println!("Provider: {name} ({})", generator.name());
    for model in generator.available_models() {
        println!(
            "  {} - {} ({}K context)",
            model.id,
            model.name,
            model.max_context / 1000
        );
    }
    println!();
}
