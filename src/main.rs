use clap::Parser;
use color_eyre::Result;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use pumptui::catalog::HttpCatalog;
use pumptui::cli::Args;
use pumptui::{App, AppConfig, AppEvent, SessionOptions};
use ratatui::DefaultTerminal;
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

fn render(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    terminal.draw(|frame| frame.render_widget(app, frame.area()))?;
    Ok(())
}

fn run(mut terminal: DefaultTerminal, config: &AppConfig, options: &SessionOptions) -> Result<()> {
    let (tx, rx) = channel::<AppEvent>();
    let catalog = Arc::new(HttpCatalog::new(
        &options.url,
        Duration::from_secs(options.timeout_secs),
    ));
    let mut app = App::new(tx.clone(), catalog, config, options)?;

    render(&mut terminal, &mut app)?;
    tx.send(AppEvent::Connect)?;

    loop {
        if crossterm::event::poll(std::time::Duration::from_millis(25))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => tx.send(AppEvent::Key(key))?,
                crossterm::event::Event::Mouse(mouse) => tx.send(AppEvent::Mouse(mouse))?,
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let updated = match rx.recv_timeout(std::time::Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(event) = app.event(&event) {
                            tx.send(event)?;
                        }
                    }
                }
                true
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => false,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if updated {
            render(&mut terminal, &mut app)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", AppConfig::default_template());
        return Ok(());
    }

    let config = match AppConfig::load(pumptui::APP_NAME) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: failed to load config ({}), using defaults", e);
            AppConfig::default()
        }
    };
    let options = SessionOptions::from_args_and_config(&args, &config);

    color_eyre::install()?;
    let terminal = ratatui::init();
    let _ = execute!(std::io::stdout(), EnableMouseCapture);
    let result = run(terminal, &config, &options);
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
