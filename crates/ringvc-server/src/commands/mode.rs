use ringvc_shared::Mode;
use ringvc_store::State;

use super::{Invoker, Outcome};

fn explain(mode: Mode) -> &'static str {
    match mode {
        Mode::Normal => "Joining a voice channel rings the people signed up for it",
        Mode::Stealth => "Joining a voice channel won't ring anyone, but you can still be rung",
        Mode::Auto => "You are in stealth while you appear offline, and normal otherwise",
    }
}

pub(super) fn set(state: &mut State, invoker: &Invoker, mode: Mode) -> Outcome {
    if state.edit_user(&invoker.user, |s| s.set_mode(mode)) {
        Outcome::reply(format!("Your mode is now `{mode}`. {}", explain(mode)))
    } else {
        Outcome::reply(format!("Your mode is already `{mode}`"))
    }
}

pub(super) fn get(state: &State, invoker: &Invoker) -> Outcome {
    let mode = state.user(&invoker.user).map(|s| s.mode()).unwrap_or_default();
    Outcome::reply(format!("Your mode is `{mode}`. {}", explain(mode)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{execute, Command};
    use ringvc_shared::UserId;

    #[test]
    fn test_set_and_get_mode() {
        let mut state = State::detached();
        let invoker = Invoker::new("me");

        let outcome = execute(&mut state, &invoker, Command::ModeSet { mode: Mode::Normal });
        assert_eq!(outcome, Outcome::Reply("Your mode is already `normal`".into()));
        assert!(state.user(&UserId::from("me")).is_none());

        execute(&mut state, &invoker, Command::ModeSet { mode: Mode::Stealth });
        let Outcome::Reply(text) = execute(&mut state, &invoker, Command::ModeGet) else {
            panic!("expected a reply");
        };
        assert!(text.starts_with("Your mode is `stealth`"));
    }
}
