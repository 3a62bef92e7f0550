use crate::runtime::{self, AppConfig};
use std::path::Path;
use termdeck_core::shell;
use termdeck_llm::util::mask_api_key;
use termdeck_llm::OllamaProvider;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("🩺 termdeck doctor\n");

    let mut all_ok = true;

    all_ok &= check_shell(config);
    all_ok &= check_working_dir();
    check_config_files();
    check_log_dir(config);
    all_ok &= check_generation(config).await;
    print_effective_config(config);

    println!();
    if all_ok {
        println!("✅ All checks passed! Ready to run termdeck.");
    } else {
        println!("⚠️  Some checks failed. Please fix the issues above.");
        std::process::exit(1);
    }

    Ok(())
}

fn check_shell(config: &AppConfig) -> bool {
    print!("Checking shell... ");

    let program = config
        .terminal
        .shell
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(shell::default_shell);

    // bare names are resolved through PATH at spawn time
    if !program.contains(std::path::MAIN_SEPARATOR) || Path::new(&program).is_file() {
        println!(
            "✅ {} ({}, {})",
            shell::shell_name(&program),
            program,
            shell::os_identifier()
        );
        true
    } else {
        println!("❌ {} not found", program);
        println!("  Set terminal.shell or TERMDECK_TERMINAL__SHELL");
        false
    }
}

fn check_working_dir() -> bool {
    print!("Checking home directory... ");

    let cwd = shell::default_cwd();
    if cwd.is_dir() {
        println!("✅ {}", cwd.display());
        true
    } else {
        println!("❌ {} is not a directory", cwd.display());
        false
    }
}

fn check_config_files() {
    print!("Checking config files... ");

    let found: Vec<&str> = ["config/default.toml", "config/local.toml", ".env"]
        .into_iter()
        .filter(|p| Path::new(p).exists())
        .collect();

    if found.is_empty() {
        println!("ℹ️  Using built-in defaults");
    } else {
        println!("✅ {}", found.join(", "));
    }
}

fn check_log_dir(config: &AppConfig) {
    print!("Checking log directory... ");

    let dir = config.logging.log_dir();
    if dir.exists() {
        println!("✅ {}", dir.display());
    } else {
        println!("ℹ️  Will create {}", dir.display());
    }
}

fn print_effective_config(config: &AppConfig) {
    println!("\nEffective configuration:");
    match toml::to_string_pretty(config) {
        Ok(text) => {
            for line in text.lines() {
                println!("  {}", line);
            }
        }
        Err(e) => println!("  ⚠️  Could not render: {}", e),
    }
}

async fn check_generation(config: &AppConfig) -> bool {
    print!("Checking command generation... ");

    let generation = &config.generation;
    if generation.is_disabled() {
        println!("ℹ️  Disabled");
        return true;
    }

    let provider = match runtime::resolve_llm_provider(generation) {
        Ok(Some(provider)) => provider,
        Ok(None) => {
            println!("ℹ️  Disabled");
            return true;
        }
        Err(e) => {
            println!("❌ {:#}", e);
            return false;
        }
    };

    match generation.provider.to_ascii_lowercase().as_str() {
        "ollama" => {
            let mut ollama = termdeck_llm::OllamaConfig::from_env()
                .with_timeout(std::time::Duration::from_secs(2));
            if let Some(url) = &generation.base_url {
                ollama = ollama.with_base_url(url);
            }
            let Ok(probe) = OllamaProvider::new(ollama) else {
                println!("❌ Could not build HTTP client");
                return false;
            };
            if probe.is_available().await {
                println!(
                    "✅ Ollama is running at {} (model {})",
                    probe.base_url(),
                    provider.default_model()
                );
                true
            } else {
                println!("⚠️  Ollama not reachable at {}", probe.base_url());
                println!("  Start Ollama with: ollama serve");
                false
            }
        }
        "openai" | "openai-compatible" => {
            let key_env = generation
                .api_key_env
                .as_deref()
                .unwrap_or(termdeck_llm::providers::openai_compat::DEFAULT_API_KEY_ENV);
            let key = std::env::var(key_env).unwrap_or_default();
            println!(
                "✅ {} key {} (model {}, connectivity test skipped)",
                key_env,
                mask_api_key(&key),
                provider.default_model()
            );
            true
        }
        _ => {
            println!("✅ {} provider", provider.name());
            true
        }
    }
}
