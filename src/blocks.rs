//! Built-in block families and their translate rules.
//!
//! Slot names follow one convention throughout: operator operands are `A`
//! and `B`, single operands are `X`, nested command chains are `DO` (with
//! `ELSE` for the second branch of `ifelse`) and procedure bodies are `STACK`.

use crate::catalog::{rule, BlockDescriptor, Catalog, FieldOptions, OutputType, Precedence, TranslateFn, Translation};
use crate::generator::{GenerateError, Resolver};
use crate::registry::{is_valid_name, BreedKind, Registries};
use crate::workspace::{format_num, BlockInstance};

const MATH_FUNCTIONS: &[&str] = &[
    "abs", "sqrt", "sin", "cos", "tan", "ln", "exp", "int", "round", "floor", "ceiling",
];

const COMPARISONS: &[&str] = &["EQ", "NEQ", "LT", "LTE", "GT", "GTE"];

const COLORS: &[&str] = &[
    "black", "gray", "white", "red", "orange", "brown", "yellow", "green", "lime", "turquoise",
    "cyan", "sky", "blue", "violet", "magenta", "pink",
];

const AGENT_PROPERTIES: &[&str] = &[
    "who", "xcor", "ycor", "heading", "color", "size", "label", "shape", "hidden?", "pxcor",
    "pycor", "pcolor", "plabel",
];

const LINK_DIRECTIONS: &[&str] = &["with", "to", "from"];

pub fn standard_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    let families = [
        literal_blocks(),
        operator_blocks(),
        agentset_blocks(),
        variable_blocks(),
        control_blocks(),
        procedure_blocks(),
        agent_command_blocks(),
        turtle_blocks(),
    ];
    for descriptor in families.into_iter().flatten() {
        if let Err(err) = catalog.register(descriptor) {
            tracing::error!(%err, "skipping built-in block");
        }
    }
    catalog
}

fn literal_blocks() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::value(
            "math_number",
            OutputType::Number,
            rule(|block, _| {
                let num = block.field_value("NUM").and_then(|v| v.as_f64()).unwrap_or(0.0);
                Ok(Translation::value(format_num(num), Precedence::Atomic))
            }),
        )
        .with_field("NUM", FieldOptions::Free),
        BlockDescriptor::value(
            "text",
            OutputType::String,
            rule(|block, _| {
                let text = block.field_text("TEXT").unwrap_or_default();
                Ok(Translation::value(quote_str(&text), Precedence::Atomic))
            }),
        )
        .with_field("TEXT", FieldOptions::Free),
        BlockDescriptor::value(
            "logic_boolean",
            OutputType::Boolean,
            rule(|block, _| {
                let value = block.field_value("BOOL").and_then(|v| v.as_bool()).unwrap_or(false);
                Ok(Translation::value(value.to_string(), Precedence::Atomic))
            }),
        )
        .with_field("BOOL", FieldOptions::Static(&["true", "false"])),
        BlockDescriptor::value(
            "color_constant",
            OutputType::Color,
            rule(|block, _| Ok(Translation::value(field_or(block, "COLOR", "black"), Precedence::Atomic))),
        )
        .with_field("COLOR", FieldOptions::Static(COLORS)),
        keyword_value("observer_ticks", OutputType::Number, "ticks"),
    ]
}

fn operator_blocks() -> Vec<BlockDescriptor> {
    vec![
        binary_block("math_add", "+", Precedence::Additive, OutputType::Number),
        binary_block("math_subtract", "-", Precedence::Additive, OutputType::Number),
        binary_block("math_multiply", "*", Precedence::Multiplicative, OutputType::Number),
        binary_block("math_divide", "/", Precedence::Multiplicative, OutputType::Number),
        binary_block("math_mod", "mod", Precedence::Multiplicative, OutputType::Number),
        binary_block("math_power", "^", Precedence::Exponent, OutputType::Number),
        binary_block("logic_and", "and", Precedence::Logical, OutputType::Boolean)
            .with_default("A", "false")
            .with_default("B", "false"),
        binary_block("logic_or", "or", Precedence::Logical, OutputType::Boolean)
            .with_default("A", "false")
            .with_default("B", "false"),
        binary_block("logic_xor", "xor", Precedence::Logical, OutputType::Boolean)
            .with_default("A", "false")
            .with_default("B", "false"),
        BlockDescriptor::value(
            "logic_compare",
            OutputType::Boolean,
            rule(|block, r| {
                let (symbol, class) = comparison(&field_or(block, "OP", "EQ"));
                let left = r.resolve_value("A", class)?;
                let right = r.resolve_value_strict("B", class)?;
                Ok(Translation::value(format!("{} {} {}", left, symbol, right), class))
            }),
        )
        .with_field("OP", FieldOptions::Static(COMPARISONS)),
        BlockDescriptor::value("logic_not", OutputType::Boolean, unary("not", Precedence::Unary))
            .with_default("X", "false"),
        BlockDescriptor::value(
            "math_function",
            OutputType::Number,
            rule(|block, r| {
                let name = field_or(block, "OP", "abs");
                call_value(r, &name, &["X"])
            }),
        )
        .with_field("OP", FieldOptions::Static(MATH_FUNCTIONS)),
        reporter_block("math_random", "random", &["X"], OutputType::Number).with_default("X", "10"),
        reporter_block("math_random_float", "random-float", &["X"], OutputType::Number)
            .with_default("X", "1"),
    ]
}

fn agentset_blocks() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::value(
            "agentset_breed",
            OutputType::Agentset,
            rule(|block, r| {
                let name = canonical_plural(r.registries(), &field_or(block, "BREED", "turtles"));
                Ok(Translation::value(name, Precedence::Atomic))
            }),
        )
        .with_field("BREED", FieldOptions::Dynamic(Registries::agent_sets)),
        BlockDescriptor::value(
            "agentset_with",
            OutputType::Agentset,
            rule(|_, r| {
                let agents = r.resolve_value("AGENTS", Precedence::Atomic)?;
                let condition = r.resolve_value("CONDITION", Precedence::None)?;
                Ok(Translation::value(format!("{} with [{}]", agents, condition), Precedence::FunctionCall))
            }),
        )
        .with_default("AGENTS", "turtles")
        .with_default("CONDITION", "true"),
        BlockDescriptor::value(
            "agent_of",
            OutputType::Any,
            rule(|_, r| {
                let reporter = r.resolve_value("REPORTER", Precedence::None)?;
                let agents = r.resolve_value("AGENTS", Precedence::Atomic)?;
                Ok(Translation::value(format!("[{}] of {}", reporter, agents), Precedence::FunctionCall))
            }),
        )
        .with_default("REPORTER", "who")
        .with_default("AGENTS", "turtles"),
        reporter_block("agentset_count", "count", &["AGENTS"], OutputType::Number)
            .with_default("AGENTS", "turtles"),
        reporter_block("agentset_any", "any?", &["AGENTS"], OutputType::Boolean)
            .with_default("AGENTS", "turtles"),
        reporter_block("agentset_one_of", "one-of", &["AGENTS"], OutputType::Agent)
            .with_default("AGENTS", "turtles"),
        reporter_block("agentset_other", "other", &["AGENTS"], OutputType::Agentset)
            .with_default("AGENTS", "turtles"),
        BlockDescriptor::value(
            "agent_numbered",
            OutputType::Agent,
            rule(|block, r| {
                let singular = canonical_singular(r.registries(), &field_or(block, "BREED", "turtle"));
                call_value(r, &singular, &["WHO"])
            }),
        )
        .with_field("BREED", FieldOptions::Dynamic(singular_turtle_options))
        .with_default("WHO", "0"),
        keyword_value("agent_self", OutputType::Agent, "self"),
        keyword_value("agent_myself", OutputType::Agent, "myself"),
        keyword_value("agent_nobody", OutputType::Agent, "nobody"),
        BlockDescriptor::value(
            "agent_property",
            OutputType::Any,
            rule(|block, _| Ok(Translation::value(field_or(block, "PROP", "who"), Precedence::Atomic))),
        )
        .with_field("PROP", FieldOptions::Static(AGENT_PROPERTIES)),
    ]
}

fn variable_blocks() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::value(
            "variable_get",
            OutputType::Any,
            rule(|block, r| {
                let name = canonical_variable(r.registries(), &field_or(block, "VAR", "0"));
                Ok(Translation::value(name, Precedence::Atomic))
            }),
        )
        .with_field("VAR", FieldOptions::Dynamic(variable_options)),
        BlockDescriptor::statement(
            "variable_set",
            rule(|block, r| {
                let name = canonical_variable(r.registries(), &field_or(block, "VAR", "x"));
                let value = r.resolve_value("VALUE", Precedence::None)?;
                Ok(Translation::statement(format!("set {} {}", name, value)))
            }),
        )
        .with_field("VAR", FieldOptions::Dynamic(variable_options)),
        BlockDescriptor::statement(
            "variable_change",
            rule(|block, r| {
                let name = canonical_variable(r.registries(), &field_or(block, "VAR", "x"));
                let delta = r.resolve_value_strict("DELTA", Precedence::Additive)?;
                Ok(Translation::statement(format!("set {} {} + {}", name, name, delta)))
            }),
        )
        .with_field("VAR", FieldOptions::Dynamic(variable_options))
        .with_default("DELTA", "1"),
        BlockDescriptor::statement(
            "variable_let",
            rule(|block, r| {
                let name = identifier_or(block, "NAME", "temp");
                let value = r.resolve_value("VALUE", Precedence::None)?;
                Ok(Translation::statement(format!("let {} {}", name, value)))
            }),
        )
        .with_field("NAME", FieldOptions::Free),
        BlockDescriptor::value(
            "variable_local",
            OutputType::Any,
            rule(|block, _| Ok(Translation::value(identifier_or(block, "NAME", "temp"), Precedence::Atomic))),
        )
        .with_field("NAME", FieldOptions::Free),
    ]
}

fn control_blocks() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::statement(
            "control_if",
            rule(|_, r| {
                let condition = r.resolve_value("CONDITION", Precedence::None)?;
                let body = r.resolve_statements("DO")?;
                Ok(Translation::statement(format!("if {} {}", condition, bracketed(&body))))
            }),
        )
        .with_default("CONDITION", "false"),
        BlockDescriptor::statement(
            "control_ifelse",
            rule(|_, r| {
                let condition = r.resolve_value("CONDITION", Precedence::None)?;
                let then_body = r.resolve_statements("DO")?;
                let else_body = r.resolve_statements("ELSE")?;
                Ok(Translation::statement(format!(
                    "ifelse {} {} {}",
                    condition,
                    bracketed(&then_body),
                    bracketed(&else_body)
                )))
            }),
        )
        .with_default("CONDITION", "false"),
        BlockDescriptor::statement(
            "control_repeat",
            rule(|_, r| {
                let times = r.resolve_value("TIMES", Precedence::None)?;
                let body = r.resolve_statements("DO")?;
                Ok(Translation::statement(format!("repeat {} {}", times, bracketed(&body))))
            }),
        )
        .with_default("TIMES", "10"),
        BlockDescriptor::statement(
            "control_while",
            rule(|_, r| {
                let condition = r.resolve_value("CONDITION", Precedence::None)?;
                let body = r.resolve_statements("DO")?;
                Ok(Translation::statement(format!("while [{}] {}", condition, bracketed(&body))))
            }),
        )
        .with_default("CONDITION", "false"),
        keyword_statement("control_stop", "stop"),
        keyword_statement("observer_clear_all", "clear-all"),
        keyword_statement("observer_reset_ticks", "reset-ticks"),
        keyword_statement("observer_tick", "tick"),
        command_block("output_show", "show", &["VALUE"]).with_default("VALUE", "\"\""),
        command_block("output_print", "print", &["VALUE"]).with_default("VALUE", "\"\""),
    ]
}

fn procedure_blocks() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::statement("procedure_define", procedure_definition("to"))
            .with_field("NAME", FieldOptions::Free),
        BlockDescriptor::statement("procedure_define_reporter", procedure_definition("to-report"))
            .with_field("NAME", FieldOptions::Free),
        command_block("procedure_report", "report", &["VALUE"]),
        BlockDescriptor::statement(
            "procedure_call",
            rule(|block, _| Ok(Translation::statement(identifier_or(block, "NAME", "setup")))),
        )
        .with_field("NAME", FieldOptions::Free),
        BlockDescriptor::value(
            "procedure_call_reporter",
            OutputType::Any,
            rule(|block, _| Ok(Translation::value(identifier_or(block, "NAME", "0"), Precedence::Atomic))),
        )
        .with_field("NAME", FieldOptions::Free),
    ]
}

fn agent_command_blocks() -> Vec<BlockDescriptor> {
    vec![
        BlockDescriptor::statement(
            "agent_ask",
            rule(|_, r| {
                let agents = r.resolve_value("AGENTS", Precedence::FunctionCall)?;
                let body = r.resolve_statements("DO")?;
                Ok(Translation::statement(format!("ask {} {}", agents, bracketed(&body))))
            }),
        )
        .with_default("AGENTS", "turtles"),
        breed_command("agent_create", "create", false),
        breed_command("agent_sprout", "sprout", true),
        breed_command("agent_hatch", "hatch", true),
        BlockDescriptor::statement(
            "agent_create_link",
            rule(|block, r| {
                let breed = canonical_singular(r.registries(), &field_or(block, "BREED", "link"));
                let direction = link_direction(r.registries(), &breed, &field_or(block, "DIRECTION", "with"));
                let target = r.resolve_value("TARGET", Precedence::FunctionCall)?;
                let body = r.resolve_statements("DO")?;
                Ok(Translation::statement(format!(
                    "create-{}-{} {}{}",
                    breed,
                    direction,
                    target,
                    optional_body(&body)
                )))
            }),
        )
        .with_field("BREED", FieldOptions::Dynamic(link_breed_options))
        .with_field("DIRECTION", FieldOptions::Static(LINK_DIRECTIONS))
        .with_default("TARGET", "nobody"),
        keyword_statement("agent_die", "die"),
    ]
}

fn turtle_blocks() -> Vec<BlockDescriptor> {
    vec![
        command_block("turtle_forward", "fd", &["STEPS"]).with_default("STEPS", "1"),
        command_block("turtle_back", "bk", &["STEPS"]).with_default("STEPS", "1"),
        command_block("turtle_right", "rt", &["DEGREES"]).with_default("DEGREES", "90"),
        command_block("turtle_left", "lt", &["DEGREES"]).with_default("DEGREES", "90"),
        command_block("turtle_setxy", "setxy", &["X", "Y"]),
        BlockDescriptor::statement(
            "agent_set_property",
            rule(|block, r| {
                let property = field_or(block, "PROP", "color");
                let value = r.resolve_value("VALUE", Precedence::None)?;
                Ok(Translation::statement(format!("set {} {}", property, value)))
            }),
        )
        .with_field("PROP", FieldOptions::Static(AGENT_PROPERTIES)),
    ]
}

/// `left SYMBOL right`, both operands resolved at the operator's own class.
/// Infix operators group to the left, so the right operand keeps its
/// parentheses even at equal class: `a - (b - c)`, `a or (b and c)`.
fn binary_block(block_type: &'static str, symbol: &'static str, class: Precedence, output: OutputType) -> BlockDescriptor {
    BlockDescriptor::value(
        block_type,
        output,
        rule(move |_, r| {
            let left = r.resolve_value("A", class)?;
            let right = r.resolve_value_strict("B", class)?;
            Ok(Translation::value(format!("{} {} {}", left, symbol, right), class))
        }),
    )
}

fn unary(symbol: &'static str, class: Precedence) -> TranslateFn {
    rule(move |_, r| {
        let operand = r.resolve_value("X", class)?;
        Ok(Translation::value(format!("{} {}", symbol, operand), class))
    })
}

/// Prefix reporter: `name arg1 arg2 ...`, every argument parenthesised
/// unless atomic.
fn reporter_block(block_type: &'static str, name: &'static str, slots: &'static [&'static str], output: OutputType) -> BlockDescriptor {
    BlockDescriptor::value(block_type, output, rule(move |_, r| call_value(r, name, slots)))
}

fn call_value(r: &mut Resolver<'_, '_>, name: &str, slots: &[&str]) -> Result<Translation, GenerateError> {
    let mut parts = vec![name.to_string()];
    for slot in slots {
        parts.push(r.resolve_value(slot, Precedence::Atomic)?);
    }
    Ok(Translation::value(parts.join(" "), Precedence::FunctionCall))
}

fn command_block(block_type: &'static str, command: &'static str, slots: &'static [&'static str]) -> BlockDescriptor {
    BlockDescriptor::statement(
        block_type,
        rule(move |_, r| {
            let mut parts = vec![command.to_string()];
            for slot in slots {
                parts.push(r.resolve_value(slot, Precedence::None)?);
            }
            Ok(Translation::statement(parts.join(" ")))
        }),
    )
}

fn keyword_statement(block_type: &'static str, keyword: &'static str) -> BlockDescriptor {
    BlockDescriptor::statement(block_type, rule(move |_, _| Ok(Translation::statement(keyword))))
}

fn keyword_value(block_type: &'static str, output: OutputType, keyword: &'static str) -> BlockDescriptor {
    BlockDescriptor::value(block_type, output, rule(move |_, _| Ok(Translation::value(keyword, Precedence::Atomic))))
}

fn procedure_definition(keyword: &'static str) -> TranslateFn {
    rule(move |block, r| {
        let name = identifier_or(block, "NAME", "setup");
        let body = r.resolve_statements("STACK")?;
        if body.is_empty() {
            Ok(Translation::statement(format!("{} {}\nend", keyword, name)))
        } else {
            Ok(Translation::statement(format!("{} {}\n{}\nend", keyword, name, body)))
        }
    })
}

/// `create-<breed>`, `sprout-<breed>` and `hatch-<breed>`: keyword composed
/// from the chosen agent-set, a count, then the body only when non-empty.
/// With `bare_base`, plain `turtles` drops the suffix (`hatch 2`).
fn breed_command(block_type: &'static str, verb: &'static str, bare_base: bool) -> BlockDescriptor {
    BlockDescriptor::statement(
        block_type,
        rule(move |block, r| {
            let breed = canonical_plural(r.registries(), &field_or(block, "BREED", "turtles"));
            let keyword = if bare_base && breed == "turtles" {
                verb.to_string()
            } else {
                format!("{}-{}", verb, breed)
            };
            let count = r.resolve_value("COUNT", Precedence::FunctionCall)?;
            let body = r.resolve_statements("DO")?;
            Ok(Translation::statement(format!("{} {}{}", keyword, count, optional_body(&body))))
        }),
    )
    .with_field("BREED", FieldOptions::Dynamic(turtle_breed_options))
    .with_default("COUNT", "1")
}

fn bracketed(body: &str) -> String {
    if body.is_empty() {
        "[]".to_string()
    } else {
        format!("[\n{}\n]", body)
    }
}

fn optional_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" {}", bracketed(body))
    }
}

/// Ordering comparisons bind tighter than `=` and `!=`.
fn comparison(op: &str) -> (&'static str, Precedence) {
    match op {
        "NEQ" => ("!=", Precedence::Equality),
        "LT" => ("<", Precedence::Relational),
        "LTE" => ("<=", Precedence::Relational),
        "GT" => (">", Precedence::Relational),
        "GTE" => (">=", Precedence::Relational),
        _ => ("=", Precedence::Equality),
    }
}

/// Undirected link breeds only take `with`; directed ones only `to`/`from`.
fn link_direction(registries: &Registries, breed: &str, requested: &str) -> &'static str {
    let kind = registries.breed(breed).map(|b| b.kind);
    match (kind, requested) {
        (Some(BreedKind::DirectedLink), "from") => "from",
        (Some(BreedKind::DirectedLink), _) => "to",
        (Some(_), _) => "with",
        (None, "to") => "to",
        (None, "from") => "from",
        (None, _) => "with",
    }
}

fn field_or(block: &BlockInstance, name: &str, fallback: &str) -> String {
    block
        .field_text(name)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Free-text names end up verbatim in the program, so anything that is not a
/// plain identifier falls back.
fn identifier_or(block: &BlockInstance, name: &str, fallback: &str) -> String {
    block
        .field_text(name)
        .map(|s| s.trim().to_string())
        .filter(|s| is_valid_name(s))
        .unwrap_or_else(|| fallback.to_string())
}

fn canonical_plural(registries: &Registries, name: &str) -> String {
    registries
        .breed(name)
        .map(|b| b.plural.clone())
        .unwrap_or_else(|| name.to_string())
}

fn canonical_singular(registries: &Registries, name: &str) -> String {
    registries
        .breed(name)
        .map(|b| b.singular.clone())
        .unwrap_or_else(|| name.to_string())
}

fn canonical_variable(registries: &Registries, name: &str) -> String {
    registries
        .variable(name)
        .map(|v| v.name.clone())
        .unwrap_or_else(|| name.to_string())
}

fn variable_options(registries: &Registries) -> Vec<String> {
    registries.variables(None).into_iter().map(|v| v.name).collect()
}

fn turtle_breed_options(registries: &Registries) -> Vec<String> {
    std::iter::once("turtles".to_string())
        .chain(registries.turtle_breeds().into_iter().map(|b| b.plural))
        .collect()
}

fn singular_turtle_options(registries: &Registries) -> Vec<String> {
    std::iter::once("turtle".to_string())
        .chain(registries.turtle_breeds().into_iter().map(|b| b.singular))
        .collect()
}

fn link_breed_options(registries: &Registries) -> Vec<String> {
    std::iter::once("link".to_string())
        .chain(registries.link_breeds().into_iter().map(|b| b.singular))
        .collect()
}

fn quote_str(s: &str) -> String {
    format!(
        "\"{}\"",
        s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_registers_every_family() {
        let catalog = standard_catalog();
        for block_type in ["math_number", "math_add", "agent_ask", "agent_create", "procedure_define", "variable_set"] {
            assert!(catalog.contains(block_type), "missing {}", block_type);
        }
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote_str(r#"say "hi"\"#), r#""say \"hi\"\\""#);
    }

    #[test]
    fn link_direction_follows_breed_kind() {
        let mut registries = Registries::new();
        registries
            .add_breed("streets", "street", BreedKind::DirectedLink)
            .unwrap();
        assert_eq!(link_direction(&registries, "street", "with"), "to");
        assert_eq!(link_direction(&registries, "street", "from"), "from");
        assert_eq!(link_direction(&registries, "link", "to"), "with");
    }
}
