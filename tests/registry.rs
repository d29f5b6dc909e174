use nlblocks_core::registry::{
    BreedKind, Namespace, Registries, RegistryError, RegistryEvent, RegistrySnapshot, VariableScope,
};
use std::cell::RefCell;
use std::rc::Rc;

fn plurals(registries: &Registries) -> Vec<String> {
    registries.breeds().into_iter().map(|b| b.plural).collect()
}

#[test]
fn builtin_breeds_always_exist() {
    let registries = Registries::new();
    assert_eq!(registries.agent_sets(), vec!["turtles", "patches", "links"]);
    assert_eq!(registries.singular_agents(), vec!["turtle", "patch", "link"]);
    assert!(registries.turtle_breeds().is_empty());
    assert!(registries.link_breeds().is_empty());
}

#[test]
fn removed_breed_can_be_added_again() {
    let mut registries = Registries::new();
    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    assert!(plurals(&registries).contains(&"wolves".to_string()));

    registries.remove_breed("wolves").unwrap();
    assert!(!plurals(&registries).contains(&"wolves".to_string()));
    assert!(registries.breed("wolf").is_none());

    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    assert_eq!(registries.breed("wolf").map(|b| b.plural.as_str()), Some("wolves"));
}

#[test]
fn protected_entries_cannot_be_removed_or_renamed() {
    let mut registries = Registries::new();
    let before = registries.breeds();
    assert_eq!(
        registries.remove_breed("turtles"),
        Err(RegistryError::Protected("turtles".to_string()))
    );
    assert_eq!(
        registries.remove_breed("links"),
        Err(RegistryError::Protected("links".to_string()))
    );
    assert_eq!(
        registries.rename_breed("patches", "cells", "cell"),
        Err(RegistryError::Protected("patches".to_string()))
    );
    assert_eq!(
        registries.remove_breed("turtle"),
        Err(RegistryError::Protected("turtle".to_string()))
    );
    assert_eq!(registries.breeds(), before);
}

#[test]
fn names_are_unique_across_the_flat_symbol_space() {
    let mut registries = Registries::new();
    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    registries.add_variable("energy", VariableScope::Turtles).unwrap();
    let before = registries.snapshot();

    assert_eq!(
        registries.add_variable("energy", VariableScope::Global),
        Err(RegistryError::DuplicateName("energy".to_string()))
    );
    assert_eq!(
        registries.add_variable("Energy", VariableScope::Patches),
        Err(RegistryError::DuplicateName("Energy".to_string()))
    );
    assert_eq!(
        registries.add_variable("wolf", VariableScope::Global),
        Err(RegistryError::DuplicateName("wolf".to_string()))
    );
    assert_eq!(
        registries.add_breed("sheep", "energy", BreedKind::Turtle),
        Err(RegistryError::DuplicateName("energy".to_string()))
    );
    assert_eq!(
        registries.add_breed("turtles", "critter", BreedKind::Turtle),
        Err(RegistryError::DuplicateName("turtles".to_string()))
    );
    assert_eq!(
        registries.add_breed("herd", "herd", BreedKind::Turtle),
        Err(RegistryError::DuplicateName("herd".to_string()))
    );
    assert_eq!(registries.snapshot(), before);
}

#[test]
fn rename_into_an_existing_name_fails_and_keeps_state() {
    let mut registries = Registries::new();
    registries.add_variable("alpha", VariableScope::Global).unwrap();
    registries.add_variable("beta", VariableScope::Global).unwrap();
    assert_eq!(
        registries.rename_variable("alpha", "beta"),
        Err(RegistryError::DuplicateName("beta".to_string()))
    );
    assert_eq!(registries.global_variables(), vec!["alpha", "beta"]);

    // Changing only the case of a name is not a collision with itself.
    registries.rename_variable("alpha", "Alpha").unwrap();
    assert_eq!(registries.global_variables(), vec!["Alpha", "beta"]);
}

#[test]
fn reserved_and_malformed_names_are_rejected() {
    let mut registries = Registries::new();
    assert_eq!(
        registries.add_variable("ask", VariableScope::Global),
        Err(RegistryError::ReservedWord("ask".to_string()))
    );
    assert_eq!(
        registries.add_breed("globals", "global", BreedKind::Turtle),
        Err(RegistryError::ReservedWord("globals".to_string()))
    );
    assert_eq!(
        registries.add_variable("3d", VariableScope::Global),
        Err(RegistryError::InvalidName("3d".to_string()))
    );
    assert_eq!(
        registries.add_variable("two words", VariableScope::Global),
        Err(RegistryError::InvalidName("two words".to_string()))
    );
    assert_eq!(
        registries.add_variable("", VariableScope::Global),
        Err(RegistryError::InvalidName(String::new()))
    );
    assert_eq!(
        registries.add_breed("cells", "cell", BreedKind::Patch),
        Err(RegistryError::InvalidKind("cells".to_string()))
    );
    registries.add_variable("max-speed_2", VariableScope::Global).unwrap();
    assert_eq!(registries.variables(None).len(), 1);
}

#[test]
fn missing_entries_report_not_found() {
    let mut registries = Registries::new();
    assert_eq!(
        registries.remove_variable("ghost"),
        Err(RegistryError::NotFound("ghost".to_string()))
    );
    assert_eq!(
        registries.rename_variable("ghost", "spirit"),
        Err(RegistryError::NotFound("ghost".to_string()))
    );
    assert_eq!(
        registries.remove_breed("dragons"),
        Err(RegistryError::NotFound("dragons".to_string()))
    );
    assert_eq!(
        registries.add_variable("energy", VariableScope::Breed("dragons".to_string())),
        Err(RegistryError::NotFound("dragons".to_string()))
    );
    assert!(registries.variable("ghost").is_none());
    assert!(registries.breed("dragons").is_none());
}

#[test]
fn breed_edits_carry_owned_variables() {
    let mut registries = Registries::new();
    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    registries
        .add_variable("hunger", VariableScope::Breed("Wolves".to_string()))
        .unwrap();
    assert_eq!(
        registries.variable("hunger").map(|v| v.scope.clone()),
        Some(VariableScope::Breed("wolves".to_string()))
    );

    registries.rename_breed("wolf", "coyotes", "coyote").unwrap();
    assert_eq!(
        registries.variable("hunger").map(|v| v.scope.clone()),
        Some(VariableScope::Breed("coyotes".to_string()))
    );

    registries.remove_breed("coyotes").unwrap();
    assert!(registries.variable("hunger").is_none());
}

#[test]
fn derived_lists_follow_breed_kinds() {
    let mut registries = Registries::new();
    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    registries.add_breed("roads", "road", BreedKind::UndirectedLink).unwrap();
    registries.add_breed("streams", "stream", BreedKind::DirectedLink).unwrap();

    assert_eq!(
        registries.agent_sets(),
        vec!["turtles", "patches", "links", "wolves", "roads", "streams"]
    );
    assert_eq!(registries.turtle_breeds().len(), 1);
    let links = registries
        .link_breeds()
        .into_iter()
        .map(|b| b.singular)
        .collect::<Vec<_>>();
    assert_eq!(links, vec!["road", "stream"]);
}

#[test]
fn listeners_see_every_successful_mutation() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut registries = Registries::new();
    let sink = Rc::clone(&events);
    registries.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    registries
        .add_variable("hunger", VariableScope::Breed("wolves".to_string()))
        .unwrap();
    let _ = registries.add_variable("hunger", VariableScope::Global);
    registries.remove_breed("wolves").unwrap();
    registries.reset();

    assert_eq!(
        *events.borrow(),
        vec![
            RegistryEvent::Added {
                namespace: Namespace::Breeds,
                name: "wolves".to_string()
            },
            RegistryEvent::Added {
                namespace: Namespace::Variables,
                name: "hunger".to_string()
            },
            RegistryEvent::Removed {
                namespace: Namespace::Variables,
                name: "hunger".to_string()
            },
            RegistryEvent::Removed {
                namespace: Namespace::Breeds,
                name: "wolves".to_string()
            },
            RegistryEvent::Reset,
        ]
    );
}

#[test]
fn snapshot_restores_through_validation() {
    let mut registries = Registries::new();
    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    registries.add_variable("population", VariableScope::Global).unwrap();
    let snapshot = registries.snapshot();

    let mut restored = Registries::new();
    restored.restore(&snapshot).unwrap();
    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.breeds(), registries.breeds());

    let broken = RegistrySnapshot {
        breeds: Vec::new(),
        variables: vec![
            nlblocks_core::registry::Variable {
                name: "twice".to_string(),
                scope: VariableScope::Global,
            },
            nlblocks_core::registry::Variable {
                name: "twice".to_string(),
                scope: VariableScope::Patches,
            },
        ],
    };
    assert_eq!(
        restored.restore(&broken),
        Err(RegistryError::DuplicateName("twice".to_string()))
    );
    assert_eq!(restored.snapshot(), snapshot);
}

#[test]
fn reset_keeps_only_builtins() {
    let mut registries = Registries::new();
    registries.add_breed("wolves", "wolf", BreedKind::Turtle).unwrap();
    registries.add_variable("population", VariableScope::Global).unwrap();
    registries.reset();
    assert_eq!(registries.agent_sets(), vec!["turtles", "patches", "links"]);
    assert!(registries.variables(None).is_empty());
}
