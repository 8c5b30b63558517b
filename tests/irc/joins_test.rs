//! Join ordering invariants.

use eevee_irc_connector::config::JoinAction;
use eevee_irc_connector::irc::joins::{sorted_joins, JoinRequest};

fn action(channel: &str, key: Option<&str>, sequence: i64) -> JoinAction {
    JoinAction {
        channel: channel.to_string(),
        key: key.map(str::to_string),
        sequence,
    }
}

#[test]
fn joins_follow_sequence_order() {
    // Descriptor lists #a before #b, but #b has the lower sequence.
    let actions = vec![action("#a", None, 2), action("#b", None, 1)];

    let ordered = sorted_joins(&actions);

    let channels: Vec<&str> = ordered.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(channels, vec!["#b", "#a"]);
}

#[test]
fn ties_keep_configured_order() {
    let actions = vec![
        action("#first", None, 5),
        action("#second", None, 5),
        action("#third", None, 5),
    ];

    let ordered = sorted_joins(&actions);

    let channels: Vec<&str> = ordered.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(channels, vec!["#first", "#second", "#third"]);
}

#[test]
fn input_order_does_not_matter() {
    let actions = vec![
        action("#c", None, 30),
        action("#a", None, 10),
        action("#b", None, 20),
    ];

    let ordered = sorted_joins(&actions);

    let channels: Vec<&str> = ordered.iter().map(|r| r.channel.as_str()).collect();
    assert_eq!(channels, vec!["#a", "#b", "#c"]);
}

#[test]
fn missing_key_becomes_empty_string() {
    let actions = vec![action("#open", None, 1), action("#locked", Some("hunter2"), 2)];

    let ordered = sorted_joins(&actions);

    assert_eq!(
        ordered,
        vec![
            JoinRequest {
                channel: "#open".to_string(),
                key: String::new(),
            },
            JoinRequest {
                channel: "#locked".to_string(),
                key: "hunter2".to_string(),
            },
        ]
    );
}

#[test]
fn empty_action_list_yields_no_joins() {
    assert!(sorted_joins(&[]).is_empty());
}

#[test]
fn negative_sequences_sort_first() {
    let actions = vec![action("#later", None, 0), action("#early", None, -1)];

    let ordered = sorted_joins(&actions);

    assert_eq!(ordered[0].channel, "#early");
}
