use colored::Colorize;

use crate::cli::Cli;
use crate::config::{EnvVars, Settings};
use crate::error::{Result, ShimError};
use crate::scenarios::{self, Scenario};
use crate::shim::BrowserActor;

pub async fn run(cli: &Cli, filter: Option<&str>) -> Result<()> {
    let scenarios: Vec<Scenario> = scenarios::all()
        .into_iter()
        .filter(|s| filter.map_or(true, |f| s.name.contains(f)))
        .collect();

    if scenarios.is_empty() {
        println!(
            "{} No scenarios match: {}",
            "!".yellow(),
            filter.unwrap_or("").bold()
        );
        return Ok(());
    }

    let env = EnvVars::from_process();
    let supplied = Settings {
        module: cli.module.clone(),
        url: cli.url.clone(),
        ..Settings::default()
    };
    let actor = BrowserActor::new(supplied, &env).await?;

    println!(
        "{} Running {} scenario(s) against {} {}\n",
        "●".cyan(),
        scenarios.len(),
        actor.config().url.bold(),
        format!("({})", actor.kind()).dimmed()
    );

    actor.initialize().await?;
    actor.before_suite().await?;

    let mut passed = 0usize;
    let mut failed = 0usize;

    for scenario in &scenarios {
        match execute(&actor, scenario).await {
            Ok(()) => {
                passed += 1;
                println!("{} {}", "✓".green(), scenario.name);
            }
            Err(err) => {
                failed += 1;
                println!("{} {}", "✗".red(), scenario.name);
                println!("  {}", err.to_string().dimmed());
            }
        }
    }

    if let Err(err) = actor.after_suite().await {
        tracing::warn!(error = %err, "after_suite hook failed");
    }
    if let Err(err) = actor.cleanup().await {
        tracing::warn!(error = %err, "backend cleanup failed");
    }

    println!();
    if failed == 0 {
        println!("{} {} passed, {} failed", "✓".green(), passed, failed);
        Ok(())
    } else {
        println!("{} {} passed, {} failed", "✗".red(), passed, failed);
        Err(ShimError::assertion(format!(
            "{failed} of {} scenario(s) failed",
            scenarios.len()
        )))
    }
}

async fn execute(actor: &BrowserActor, scenario: &Scenario) -> Result<()> {
    actor.before_test(scenario.name).await?;
    let outcome = scenario.run(actor).await;
    if let Err(ref err) = outcome {
        tracing::debug!(scenario = scenario.name, error = %err, "scenario failed");
        if let Err(hook_err) = actor.on_failure(scenario.name).await {
            tracing::warn!(error = %hook_err, "on_failure hook failed");
        }
    }
    if let Err(hook_err) = actor.after_test(scenario.name).await {
        tracing::warn!(error = %hook_err, "after_test hook failed");
    }
    outcome
}
