//! lessonforge CLI: user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "lessonforge",
    version,
    about = "AI literacy lessons, shuffled quizzes, and an LLM prompt playground"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Content file or directory (overrides `content_dir` from the config)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// User data directory (overrides `data_dir` from the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and example content
    Init,

    /// Validate lesson and quiz content
    Validate,

    /// List lessons, with lock state when a user is given
    Lessons {
        #[arg(long)]
        user: Option<String>,
    },

    /// Show a lesson, optionally marking it completed
    Lesson {
        #[arg(long)]
        id: u32,

        #[arg(long)]
        user: Option<String>,

        /// Record the lesson as completed for --user
        #[arg(long, requires = "user")]
        complete: bool,
    },

    /// List quizzes, with best scores when a user is given
    Quizzes {
        #[arg(long)]
        user: Option<String>,
    },

    /// Take a quiz interactively
    Quiz {
        #[arg(long)]
        id: u32,

        /// Save the result for this user
        #[arg(long)]
        user: Option<String>,

        /// Seed the option shuffle (reproducible order)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Create a user account (password is read from stdin)
    Register {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        organization: String,
    },

    /// Check a user's password (read from stdin)
    Login {
        #[arg(long)]
        username: String,
    },

    /// Show or change profile, password, or progress (current password on stdin)
    Settings {
        #[arg(long)]
        user: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        organization: Option<String>,

        /// Read the new password and its confirmation as the next two stdin lines
        #[arg(long)]
        change_password: bool,

        /// Clear lesson progress and quiz scores
        #[arg(long)]
        reset_progress: bool,

        /// Confirm --reset-progress
        #[arg(long)]
        yes: bool,
    },

    /// List registered users (admin password on stdin)
    Users {
        /// Print as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Delete a user and their conversations (admin password on stdin)
    DeleteUser {
        #[arg(long)]
        username: String,
    },

    /// Show a user's lesson progress and quiz scores
    Progress {
        #[arg(long)]
        user: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send a prompt to the text generator
    Chat {
        /// Prompt text
        #[arg(long, conflicts_with = "template")]
        prompt: Option<String>,

        /// Prompt template name (see `templates`)
        #[arg(long)]
        template: Option<String>,

        /// Template values as key=value
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Model id (defaults to the config's default model)
        #[arg(long)]
        model: Option<String>,

        /// Provider name from the config
        #[arg(long)]
        provider: Option<String>,

        /// Continue a saved conversation of --user
        #[arg(long = "continue", value_name = "ID", requires = "user")]
        continue_id: Option<String>,

        /// Save the exchange under this title for --user
        #[arg(long, requires = "user")]
        save: Option<String>,

        #[arg(long)]
        user: Option<String>,
    },

    /// List prompt templates
    Templates,

    /// List, show, or delete a user's saved conversations
    Conversations {
        #[arg(long)]
        user: String,

        #[arg(long, conflicts_with = "delete")]
        show: Option<String>,

        #[arg(long)]
        delete: Option<String>,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lessonforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let paths = commands::Paths {
        config: cli.config,
        content: cli.content,
        data_dir: cli.data_dir,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate => commands::validate::execute(&paths),
        Commands::Lessons { user } => commands::lessons::list(&paths, user),
        Commands::Lesson { id, user, complete } => {
            commands::lessons::show(&paths, id, user, complete)
        }
        Commands::Quizzes { user } => commands::quiz::list(&paths, user),
        Commands::Quiz { id, user, seed } => commands::quiz::execute(&paths, id, user, seed),
        Commands::Register {
            username,
            email,
            name,
            organization,
        } => commands::account::register(&paths, username, email, name, organization),
        Commands::Login { username } => commands::account::login(&paths, &username),
        Commands::Settings {
            user,
            name,
            email,
            organization,
            change_password,
            reset_progress,
            yes,
        } => commands::account::settings(
            &paths,
            commands::account::SettingsArgs {
                user,
                name,
                email,
                organization,
                change_password,
                reset_progress,
                yes,
            },
        ),
        Commands::Users { csv } => commands::admin::users(&paths, csv),
        Commands::DeleteUser { username } => commands::admin::delete_user(&paths, &username),
        Commands::Progress { user, json } => commands::account::progress(&paths, &user, json),
        Commands::Chat {
            prompt,
            template,
            vars,
            model,
            provider,
            continue_id,
            save,
            user,
        } => {
            commands::chat::execute(
                &paths,
                commands::chat::ChatArgs {
                    prompt,
                    template,
                    vars,
                    model,
                    provider,
                    continue_id,
                    save,
                    user,
                },
            )
            .await
        }
        Commands::Templates => commands::chat::templates(&paths),
        Commands::Conversations { user, show, delete } => {
            commands::chat::conversations(&paths, &user, show, delete)
        }
        Commands::ListModels { provider } => commands::list_models::execute(&paths, provider),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
