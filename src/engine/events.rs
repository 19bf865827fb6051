//! Event rules of one character.
//!
//! A rule maps an event raised by one of the character's scenes or paths to
//! an action. Every rule registered for an event fires, in registration
//! order. Events nobody registered for are ignored.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::animation::SceneId;
use super::character::EffectCharacter;
use super::motion::PathId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    SceneActivated(SceneId),
    SceneComplete(SceneId),
    PathActivated(PathId),
    PathComplete(PathId),
}

/// Code run against the character when its event fires. Arguments the
/// callback needs are captured by the closure.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&mut EffectCharacter)>);

impl Callback {
    pub fn new(f: impl Fn(&mut EffectCharacter) + 'static) -> Self {
        Callback(Rc::new(f))
    }

    pub(crate) fn call(&self, character: &mut EffectCharacter) {
        (self.0)(character)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    ActivateScene(SceneId),
    DeactivateScene(SceneId),
    ActivatePath(PathId),
    DeactivatePath(PathId),
    Callback(Callback),
}

#[derive(Debug, Clone, Default)]
pub struct EventHandler {
    rules: HashMap<Event, Vec<Action>>,
}

impl EventHandler {
    pub(crate) fn register(&mut self, event: Event, action: Action) {
        self.rules.entry(event).or_default().push(action);
    }

    pub fn actions_for(&self, event: &Event) -> &[Action] {
        self.rules.get(event).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_accumulate_in_order() {
        let mut handler = EventHandler::default();
        let event = Event::SceneComplete(SceneId::new("a"));
        handler.register(event.clone(), Action::ActivateScene(SceneId::new("b")));
        handler.register(event.clone(), Action::ActivatePath(PathId::new("p")));
        let actions = handler.actions_for(&event);
        assert_eq!(actions.len(), 2);
        assert!(matches!(&actions[0], Action::ActivateScene(id) if id.as_str() == "b"));
        assert!(matches!(&actions[1], Action::ActivatePath(id) if id.as_str() == "p"));
        assert_eq!(handler.rule_count(), 2);
    }

    #[test]
    fn test_unregistered_event_has_no_actions() {
        let handler = EventHandler::default();
        assert!(handler
            .actions_for(&Event::PathComplete(PathId::new("x")))
            .is_empty());
    }
}
