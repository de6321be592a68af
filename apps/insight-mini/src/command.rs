use insight_protocol::FilterField;

pub const HELP: &str = "commands: set <field> <value> | clear <field> | reset | options <field> | filters | refresh | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set(FilterField, String),
    Clear(FilterField),
    Reset,
    Options(FilterField),
    Filters,
    Refresh,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match verb {
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .map(|(field, value)| (field, value.trim()))
                .filter(|(_, value)| !value.is_empty())
                .ok_or("usage: set <field> <value>")?;
            Command::Set(field_arg(field)?, value.to_string())
        }
        "clear" => Command::Clear(field_arg(rest)?),
        "options" => Command::Options(field_arg(rest)?),
        "reset" => Command::Reset,
        "filters" => Command::Filters,
        "refresh" => Command::Refresh,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command: {other} ({HELP})")),
    };
    Ok(Some(command))
}

fn field_arg(raw: &str) -> Result<FilterField, String> {
    if raw.is_empty() {
        return Err("missing field name".into());
    }
    raw.parse().map_err(|err| format!("{err}"))
}

/// `field=value` from the command line.
pub fn parse_filter(raw: &str) -> Result<(FilterField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got {raw}"))?;
    Ok((field_arg(field.trim())?, value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_keeps_spaces_in_the_value() {
        assert_eq!(
            parse("  set sector   Oil & Gas ").expect("parse"),
            Some(Command::Set(FilterField::Sector, "Oil & Gas".into()))
        );
    }

    #[test]
    fn simple_verbs_and_blank_lines() {
        assert_eq!(parse("").expect("blank"), None);
        assert_eq!(parse("reset").expect("reset"), Some(Command::Reset));
        assert_eq!(parse("exit").expect("exit"), Some(Command::Quit));
        assert_eq!(
            parse("clear end_year").expect("clear"),
            Some(Command::Clear(FilterField::EndYear))
        );
        assert_eq!(
            parse("options swot").expect("options"),
            Some(Command::Options(FilterField::Swot))
        );
    }

    #[test]
    fn bad_input_is_reported_not_fatal() {
        assert!(parse("set sector").is_err());
        assert!(parse("clear").is_err());
        assert!(parse("clear colour").expect_err("unknown field").contains("colour"));
        assert!(parse("draw").expect_err("unknown verb").starts_with("unknown command"));
    }

    #[test]
    fn filter_flag_splits_on_first_equals() {
        assert_eq!(
            parse_filter("topic=a=b").expect("filter"),
            (FilterField::Topic, "a=b".into())
        );
        assert!(parse_filter("sector").is_err());
        assert!(parse_filter("colour=blue").is_err());
    }
}
