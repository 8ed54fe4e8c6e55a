mod app;
mod auth;
mod cache;
mod config;
mod error;
mod session;
mod todos;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use todos::types::{ImageUpload, SignUpDraft, Todo, TodoDraft, TodoStatus};

#[derive(Parser, Debug)]
#[command(name = "todoq")]
#[command(about = "A command-line client for a todo REST API with an optimistic query cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/todoq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

fn parse_status(s: &str) -> Result<TodoStatus, String> {
  s.parse()
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List todos
  List {
    /// Search text
    #[arg(short, long, default_value = "")]
    search: String,

    /// Status filter; repeat for multiple values (todo, in-progress, completed)
    #[arg(long = "status", value_parser = parse_status)]
    status: Vec<TodoStatus>,

    /// Number of pages to fetch
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },

  /// Create a todo
  Add {
    title: String,

    #[arg(short, long)]
    description: Option<String>,

    /// Path to an image to attach
    #[arg(long)]
    image: Option<PathBuf>,

    #[arg(long, value_parser = parse_status)]
    status: Option<TodoStatus>,
  },

  /// Update a todo; unspecified fields keep their current values
  Edit {
    id: String,

    #[arg(long)]
    title: Option<String>,

    #[arg(short, long)]
    description: Option<String>,

    #[arg(long)]
    image: Option<PathBuf>,

    #[arg(long, value_parser = parse_status)]
    status: Option<TodoStatus>,
  },

  /// Delete a todo
  Rm { id: String },

  /// Exchange the identity provider's token for a session
  Login {
    #[arg(long)]
    email: String,
  },

  /// Clear the session and the query cache
  Logout,

  /// Show the signed-in principal
  Whoami,

  /// Register a new account
  SignUp {
    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    /// Path to a profile picture
    #[arg(long)]
    picture: Option<PathBuf>,
  },
}

fn load_image(path: &PathBuf) -> Result<ImageUpload> {
  let bytes = std::fs::read(path)?;
  let file_name = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| "image".to_string());
  Ok(ImageUpload { file_name, bytes })
}

fn print_todos(todos: &[Todo]) {
  for todo in todos {
    let description = todo.description.as_deref().unwrap_or("");
    println!("[{}] {}  {}  {}", todo.status, todo.id, todo.title, description);
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;
  let mut app = app::App::new(config).await?;

  match args.command {
    Command::List { search, status, pages } => {
      let todos = app.list(search, status, pages).await?;
      print_todos(&todos);
    }
    Command::Add { title, description, image, status } => {
      let draft = TodoDraft {
        title,
        description,
        image: image.as_ref().map(load_image).transpose()?,
        status: status.unwrap_or_default(),
      };
      let created = app.create(draft).await?;
      println!("created {}", created.id);
    }
    Command::Edit { id, title, description, image, status } => {
      let image = image.as_ref().map(load_image).transpose()?;
      let updated = app.update(id, title, description, status, image).await?;
      println!("updated {}", updated.id);
    }
    Command::Rm { id } => {
      app.delete(id.clone()).await?;
      println!("deleted {}", id);
    }
    Command::Login { email } => {
      let principal = app.login(email).await?;
      println!("signed in as {} <{}>", principal.full_name, principal.email);
    }
    Command::Logout => {
      app.logout()?;
      println!("signed out");
    }
    Command::Whoami => match app.whoami() {
      Some(principal) => println!("{} <{}>", principal.full_name, principal.email),
      None => println!("not signed in"),
    },
    Command::SignUp { first_name, last_name, email, password, picture } => {
      let draft = SignUpDraft {
        first_name,
        last_name,
        email,
        password,
        profile_picture: picture.as_ref().map(load_image).transpose()?,
      };
      let principal = app.sign_up(draft).await?;
      println!("account created for {}; log in to continue", principal.email);
    }
  }

  Ok(())
}
