//! Commands that only make sense in the desktop front end.

use std::cell::Cell;
use std::rc::Rc;

use pagetty_terminal::{CommandRegistry, NamedCommand};

/// Register `echo` and `exit`. `exit` raises `quit`.
pub fn register_app_commands(reg: &mut CommandRegistry, quit: Rc<Cell<bool>>) {
    reg.register(Box::new(
        NamedCommand::new("echo", |term, args, done| {
            term.append_line(args);
            done.finish(term);
            Ok(())
        })
        .description("Prints its arguments")
        .usage("echo TEXT"),
    ));
    reg.register(Box::new(
        NamedCommand::new("exit", move |term, _args, done| {
            quit.set(true);
            term.append_line("Bye.");
            done.finish(term);
            Ok(())
        })
        .description("Leaves the terminal")
        .alias("quit"),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagetty_terminal::{Terminal, Transcript};
    use pagetty_types::config::TerminalConfig;

    fn term(quit: Rc<Cell<bool>>) -> (Terminal, Transcript) {
        let reg = CommandRegistry::shared();
        register_app_commands(&mut reg.borrow_mut(), quit);
        let out = Transcript::new();
        let mut t = Terminal::new(TerminalConfig::default(), reg, Box::new(out.clone()));
        t.boot();
        (t, out)
    }

    #[test]
    fn echo_prints_args() {
        let (mut t, out) = term(Rc::new(Cell::new(false)));
        t.eval_input("echo hello there").unwrap();
        assert!(out.has_line("hello there"));
    }

    #[test]
    fn quit_alias_raises_flag() {
        let quit = Rc::new(Cell::new(false));
        let (mut t, out) = term(Rc::clone(&quit));
        t.eval_input("quit").unwrap();
        assert!(quit.get());
        assert!(out.has_line("Bye."));
    }
}
