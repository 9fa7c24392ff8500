use clap::Parser;
use miette::Result;
use rtt::cli::{Cli, Commands};
use rtt::core::logging::{self, LogLevel};
use rtt::core::Config;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let config = Config::load();
    let level = LogLevel::from_flags(global.verbose, global.quiet);
    if let Err(e) = logging::init(level, config.log_format()) {
        eprintln!("{}", e);
    }
    for issue in &config.issues {
        tracing::warn!("{}", issue);
    }

    match cli.command {
        Commands::Init(args) => rtt::cli::commands::init::run(args, &global),
        Commands::List(args) => rtt::cli::commands::list::run(args, &global),
        Commands::Search(args) => rtt::cli::commands::search::run(args, &global),
        Commands::Show(args) => rtt::cli::commands::show::run(args, &global),
        Commands::New(args) => rtt::cli::commands::new::run(args, &global),
        Commands::Validate(args) => rtt::cli::commands::validate::run(args, &global),
        Commands::Variables(args) => rtt::cli::commands::variables::run(args, &global),
        Commands::Render(args) => rtt::cli::commands::render::run(args, &global),
        Commands::Preview(args) => rtt::cli::commands::preview::run(args, &global),
        Commands::Delete(args) => rtt::cli::commands::delete::run(args, &global),
        Commands::Version(cmd) => rtt::cli::commands::version::run(cmd, &global),
        Commands::Export(args) => rtt::cli::commands::export::run(args, &global),
        Commands::Import(args) => rtt::cli::commands::import::run(args, &global),
        Commands::Stats(args) => rtt::cli::commands::stats::run(args, &global),
        Commands::Completions(args) => rtt::cli::commands::completions::run(args),
    }
}
