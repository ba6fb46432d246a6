// tests/command_rendering.rs

use proptest::prelude::*;

use orgseq::exec::command::quote_if_needed;
use orgseq::exec::{CliCommand, SfCommand};
use orgseq::types::{ActionKind, FailurePolicy};

#[test]
fn flags_render_in_order_with_switch_rules() {
    let line = CliCommand::new(SfCommand::PackageInstall)
        .flag("package", "04tXXX")
        .flag("target-org", "demo-scratch")
        .flag("wait", 10i64)
        .flag("no-prompt", true)
        .flag("skip-validation", false)
        .flag("o", "short")
        .render("sf");

    assert_eq!(
        line,
        "sf package install --package 04tXXX --target-org demo-scratch --wait 10 --no-prompt -o short"
    );
}

#[test]
fn positional_args_come_before_flags() {
    let line = CliCommand::new(SfCommand::AliasSet)
        .arg("demo=demo.user@example.com")
        .flag("json", true)
        .render("sf");

    assert_eq!(line, "sf alias set demo=demo.user@example.com --json");
}

#[test]
fn values_with_spaces_are_quoted() {
    let line = CliCommand::new(SfCommand::ProjectDeployStart)
        .flag("metadata-dir", "/work/My Project/mdapi")
        .render("sf");

    assert_eq!(line, r#"sf project deploy start --metadata-dir "/work/My Project/mdapi""#);
}

#[test]
fn shell_metacharacters_are_escaped() {
    assert_eq!(quote_if_needed("plain-value_1.0"), "plain-value_1.0");
    assert_eq!(quote_if_needed(""), r#""""#);
    assert_eq!(quote_if_needed("a$b"), r#""a\$b""#);
    assert_eq!(quote_if_needed(r#"say "hi""#), r#""say \"hi\"""#);
    assert_eq!(quote_if_needed("x;rm"), r#""x;rm""#);
}

#[test]
fn action_kinds_parse_case_insensitively() {
    for kind in ActionKind::ALL {
        assert_eq!(kind.as_str().to_uppercase().parse::<ActionKind>(), Ok(kind));
        assert_eq!(format!("  {kind} ").parse::<ActionKind>(), Ok(kind));
    }
    assert!("deploy".parse::<ActionKind>().is_err());
}

#[test]
fn failure_policies_decide_on_their_own_signal() {
    assert!(FailurePolicy::Stderr.is_failure("boom", Some(0)));
    assert!(!FailurePolicy::Stderr.is_failure("", Some(1)));
    assert!(FailurePolicy::ExitCode.is_failure("", Some(2)));
    assert!(FailurePolicy::ExitCode.is_failure("", None));
    assert!(!FailurePolicy::ExitCode.is_failure("warning", Some(0)));
    assert!(FailurePolicy::Either.is_failure("warning", Some(0)));
    assert!(FailurePolicy::Either.is_failure("", Some(1)));
    assert!(!FailurePolicy::Either.is_failure("", Some(0)));

    assert_eq!("Exit_Code".parse::<FailurePolicy>(), Ok(FailurePolicy::ExitCode));
    assert!("never".parse::<FailurePolicy>().is_err());
}

#[test]
fn whitespace_only_stderr_still_counts_as_output() {
    assert!(FailurePolicy::Stderr.is_failure("\n", Some(0)));
    assert!(FailurePolicy::Either.is_failure("  \n", Some(0)));
    assert!(!FailurePolicy::ExitCode.is_failure("\n", Some(0)));
}

/// Undo `quote_if_needed` the way a POSIX shell reads a double-quoted word.
fn shell_unquote(word: &str) -> String {
    let Some(inner) = word.strip_prefix('"').and_then(|w| w.strip_suffix('"')) else {
        return word.to_string();
    };
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

proptest! {
    #[test]
    fn quoting_preserves_the_value(value in "[ -~]{0,24}") {
        prop_assert_eq!(shell_unquote(&quote_if_needed(&value)), value);
    }

    #[test]
    fn safe_values_are_left_alone(value in "[A-Za-z0-9_./:@=-]{1,24}") {
        prop_assert_eq!(quote_if_needed(&value), value);
    }

    #[test]
    fn rendered_line_keeps_every_flag_value(values in proptest::collection::vec("[a-z0-9]{1,8}", 1..6)) {
        let mut cmd = CliCommand::new(SfCommand::DataImportTree);
        for (i, v) in values.iter().enumerate() {
            cmd = cmd.flag(format!("flag-{i}"), v.as_str());
        }
        let line = cmd.render("sf");
        let words: Vec<&str> = line.split(' ').collect();

        prop_assert_eq!(&words[..4], &["sf", "data", "import", "tree"][..]);
        for (i, v) in values.iter().enumerate() {
            let flag = format!("--flag-{i}");
            prop_assert_eq!(words[4 + 2 * i], flag.as_str());
            prop_assert_eq!(words[5 + 2 * i], v.as_str());
        }
    }
}
