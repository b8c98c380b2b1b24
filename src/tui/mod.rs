pub mod event;
pub mod screens;
pub mod widgets;

use std::io::{self, Stdout};

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::Terminal;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Put the terminal in raw mode on the alternate screen.
///
/// Also installs a panic hook that restores the terminal first, so a panic
/// message is readable.
pub fn init() -> io::Result<Tui> {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        previous_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

pub fn restore() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run `screen` on an initialised terminal and restore it afterwards,
/// whether or not the screen succeeded.
pub fn run_screen<T>(screen: impl FnOnce(&mut Tui) -> anyhow::Result<T>) -> anyhow::Result<T> {
    let mut terminal = init()?;
    let result = screen(&mut terminal);
    restore()?;
    result
}
