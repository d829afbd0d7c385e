use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use cfs::{CfsResult, Confirm, Container, FormatConfig, ListFlags, TouchFlags};
use clap::{Parser, Subcommand};
use log::error;

/// Work with a CFS container file.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Container file
    container: PathBuf,

    /// Log every record read and write
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create (or overwrite) the container
    Create {
        /// JSON file with creation parameters
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        block_size: Option<i32>,
        #[arg(long)]
        filename_size: Option<i32>,
        #[arg(long)]
        max_file_size: Option<i32>,
        #[arg(long)]
        max_dir_entries: Option<i32>,
    },
    /// Print the superblock
    Info,
    Mkdir { path: String },
    /// Refresh timestamps, creating the file when missing
    Touch {
        path: String,
        /// Access time only
        #[arg(short)]
        a: bool,
        /// Modification time only
        #[arg(short)]
        m: bool,
    },
    /// List a directory; without options every attribute is shown
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Show `.` and `..`
        #[arg(short = 'a')]
        all: bool,
        #[arg(short = 'r')]
        recursive: bool,
        #[arg(short = 'l')]
        long: bool,
        /// Storage order
        #[arg(short = 'u')]
        unordered: bool,
        /// Directories only
        #[arg(short = 'd')]
        dirs: bool,
        /// Hard-linked files only
        #[arg(short = 'H')]
        links: bool,
        #[arg(long)]
        json: bool,
    },
    Cat { path: String },
    /// Create a file with the given text
    Write { path: String, text: String },
    /// Hard link
    Ln { source: String, dest: String },
    Mv { source: String, dest: String },
    Cp {
        source: String,
        dest: String,
        #[arg(short = 'r')]
        recursive: bool,
    },
    /// Remove a file, or the contents of a directory
    Rm {
        path: String,
        #[arg(short = 'r')]
        recursive: bool,
        /// Ask before every deletion
        #[arg(short = 'i')]
        interactive: bool,
    },
    Stat {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Copy a host file or directory into the container
    Import { host: PathBuf, dest: Option<String> },
    /// Copy an entity out to a host directory
    Export { path: String, host_dir: PathBuf },
}

fn ask(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> CfsResult<String> {
    Ok(serde_json::to_string_pretty(value).map_err(io::Error::from)?)
}

fn open_container(args: &Args, command: &Command) -> CfsResult<Container> {
    let Command::Create {
        config,
        block_size,
        filename_size,
        max_file_size,
        max_dir_entries,
    } = command
    else {
        return Container::open(&args.container);
    };
    let mut cfg = match config {
        Some(path) => FormatConfig::load(path)?,
        None => FormatConfig::default(),
    };
    if let Some(v) = block_size {
        cfg.block_size = *v;
    }
    if let Some(v) = filename_size {
        cfg.filename_size = *v;
    }
    if let Some(v) = max_file_size {
        cfg.max_file_size = *v;
    }
    if let Some(v) = max_dir_entries {
        cfg.max_dir_entries = *v;
    }
    Container::create(&args.container, &cfg)
}

fn run(args: Args) -> CfsResult<()> {
    let mut fs = open_container(&args, &args.command)?;

    match &args.command {
        Command::Create { .. } => println!("created {}", args.container.display()),
        Command::Info => println!("{}", to_json(fs.superblock())?),
        Command::Mkdir { path } => {
            fs.make_directory(path)?;
        }
        Command::Touch { path, a, m } => {
            let mut flags = TouchFlags::empty();
            flags.set(TouchFlags::ACCESS, *a);
            flags.set(TouchFlags::MODIFICATION, *m);
            fs.touch(path, flags)?;
        }
        Command::Ls {
            path,
            all,
            recursive,
            long,
            unordered,
            dirs,
            links,
            json,
        } => {
            let mut flags = ListFlags::empty();
            flags.set(ListFlags::ALL, *all);
            flags.set(ListFlags::RECURSIVE, *recursive);
            flags.set(ListFlags::LONG, *long);
            flags.set(ListFlags::UNORDERED, *unordered);
            flags.set(ListFlags::DIRS_ONLY, *dirs);
            flags.set(ListFlags::LINKS_ONLY, *links);
            let flags = flags.or_long_view();
            let entries = fs.list(path, flags)?.collect::<CfsResult<Vec<_>>>()?;
            if *json {
                println!("{}", to_json(&entries)?);
                return fs.close();
            }
            for entry in &entries {
                let indent = "  ".repeat(entry.depth);
                if flags.contains(ListFlags::LONG) {
                    let s = &entry.stat;
                    println!(
                        "{}{:>5} {:<9} {:>5} {:>3} {:>11} {}",
                        indent,
                        s.id,
                        format!("{:?}", s.kind).to_lowercase(),
                        s.size,
                        s.link_count + 1,
                        s.modified,
                        entry.name
                    );
                } else {
                    println!("{}{}", indent, entry.name);
                }
            }
        }
        Command::Cat { path } => {
            let content = fs.read_file(path)?;
            io::stdout().write_all(&content)?;
        }
        Command::Write { path, text } => {
            fs.write_file(path, text.as_bytes())?;
        }
        Command::Ln { source, dest } => fs.link(source, dest)?,
        Command::Mv { source, dest } => fs.move_entity(source, dest)?,
        Command::Cp {
            source,
            dest,
            recursive,
        } => {
            fs.copy(source, dest, *recursive)?;
        }
        Command::Rm {
            path,
            recursive,
            interactive,
        } => {
            let mut answer = ask;
            let prompt: Option<&mut dyn Confirm> = if *interactive { Some(&mut answer) } else { None };
            fs.remove(path, *recursive, prompt)?;
        }
        Command::Stat { path, json } => {
            let stat = fs.stat(path)?;
            if *json {
                println!("{}", to_json(&stat)?);
            } else {
                println!("{:#?}", stat);
            }
        }
        Command::Import { host, dest } => {
            let id = fs.import(host, dest.as_deref())?;
            println!("imported {} as node {}", host.display(), id);
        }
        Command::Export { path, host_dir } => {
            let written = fs.export(path, host_dir)?;
            println!("exported to {}", written.display());
        }
    }

    fs.close()
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
