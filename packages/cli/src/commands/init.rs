use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

const SAMPLE_PAGE: &str = r#"{
  "tree": [
    {
      "tag": "div",
      "id": "root:main",
      "children": [
        { "tag": "h1", "id": "counter:main", "text": "0" },
        {
          "tag": "p",
          "id": "limit:main",
          "styles": { "display": "none" },
          "text": "That's the limit"
        }
      ]
    }
  ],
  "instances": [
    {
      "id": "main",
      "variables": {
        "count": {
          "value": 0,
          "dependencies": {
            "counter": [{ "dependency_type": "Value" }],
            "limit": [{ "dependency_type": "Visible", "condition": "5" }]
          }
        }
      }
    }
  ]
}
"#;

const SAMPLE_SCRIPT: &str = r#"[
  { "kind": "increment", "variable": "count", "by": 2, "clampMax": 5 },
  {
    "kind": "interaction",
    "actions": [
      {
        "action": "increment",
        "target": "count",
        "parameters": { "by": [{ "value": "3", "reference": null }] }
      }
    ]
  }
]
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for the sample page and script
    #[arg(short, long, default_value = "pages")]
    pub pages_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Weave project...".bright_blue().bold());

    let pages_dir = PathBuf::from(cwd).join(&args.pages_dir);
    if !pages_dir.exists() {
        fs::create_dir_all(&pages_dir)?;
        println!("  {} Created {}/", "✓".green(), args.pages_dir);
    }

    for (name, content) in [("counter.page.json", SAMPLE_PAGE), ("counter.script.json", SAMPLE_SCRIPT)] {
        let path = pages_dir.join(name);
        if !path.exists() {
            fs::write(&path, content)?;
            println!("  {} Created {}", "✓".green(), name);
        }
    }

    let config_json = serde_json::to_string_pretty(&Config::default())?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: weave check {}/counter.page.json", args.pages_dir);
    println!(
        "  2. Run: weave replay {0}/counter.page.json --script {0}/counter.script.json",
        args.pages_dir
    );

    Ok(())
}
