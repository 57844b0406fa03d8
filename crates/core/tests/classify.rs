use pretty_assertions::assert_eq;
use timeliner_core::classify::{classify, extract_handles, Classification, InteractionKind};

fn targets(c: &Classification) -> (Option<&str>, Option<&str>, Option<&str>) {
    (
        c.mention_target.as_deref(),
        c.quote_target.as_deref(),
        c.reply_target.as_deref(),
    )
}

#[test]
fn test_plain_post_is_regular() {
    let c = classify("hello world", "", "");
    assert_eq!(
        c,
        Classification {
            is_regular_post: true,
            ..Classification::default()
        }
    );
    assert_eq!(c.kind(), InteractionKind::Regular);
}

#[test]
fn test_mention_only_stays_regular() {
    let c = classify("hi @alice", "", "");
    assert!(c.is_regular_post);
    assert!(c.is_mention);
    assert!(!c.is_reply && !c.is_quote);
    assert_eq!(targets(&c), (Some("@alice"), None, None));
    assert_eq!(c.kind(), InteractionKind::Mention);
}

#[test]
fn test_reply_only() {
    let c = classify("reply text", "@bob", "");
    assert_eq!(
        c,
        Classification {
            is_reply: true,
            reply_target: Some("@bob".to_string()),
            ..Classification::default()
        }
    );
}

#[test]
fn test_mention_and_reply() {
    let c = classify("@carol thanks", "@bob", "");
    assert!(c.is_mention && c.is_reply);
    assert!(!c.is_regular_post && !c.is_quote);
    assert_eq!(targets(&c), (Some("@carol"), None, Some("@bob")));
    assert_eq!(c.kind(), InteractionKind::MentionReply);
}

#[test]
fn test_mention_and_quote() {
    let c = classify("cc @carol @dan", "", "Erin @erin");
    assert!(c.is_mention && c.is_quote);
    assert_eq!(targets(&c), (Some("@carol @dan"), Some("@erin"), None));
    assert_eq!(c.kind(), InteractionKind::MentionQuote);
}

#[test]
fn test_quote_wins_over_reply_without_mentions() {
    let c = classify("look", "Replying to @bob", "@erin");
    assert_eq!(c.kind(), InteractionKind::Quote);
    assert_eq!(targets(&c), (None, Some("@erin"), None));
}

#[test]
fn test_placeholder_context_is_absent() {
    let c = classify("nothing to see", "NA", "NA");
    assert_eq!(c.kind(), InteractionKind::Regular);
    assert_eq!(targets(&c), (None, None, None));
}

#[test]
fn test_multiple_reply_targets_are_space_joined() {
    let c = classify("yes", "Replying to @bob and @carol", "");
    assert_eq!(c.reply_target.as_deref(), Some("@bob @carol"));
}

#[test]
fn test_exactly_one_category_holds() {
    let bodies = ["plain", "hey @a", "@a and @b"];
    let contexts = ["", "NA", "@ctx", "Replying to @x @y"];
    for body in bodies {
        for reply in contexts {
            for quote in contexts {
                let c = classify(body, reply, quote);
                let flags = [
                    c.is_regular_post && !c.is_mention,
                    c.is_regular_post && c.is_mention,
                    c.is_quote && !c.is_mention,
                    c.is_reply && !c.is_mention,
                    c.is_mention && c.is_reply,
                    c.is_mention && c.is_quote,
                ];
                assert_eq!(
                    flags.iter().filter(|&&f| f).count(),
                    1,
                    "{body:?} / {reply:?} / {quote:?} -> {c:?}"
                );
                assert_eq!(c.mention_target.is_some(), c.is_mention);
                assert_eq!(c.quote_target.is_some(), c.is_quote);
                assert_eq!(c.reply_target.is_some(), c.is_reply);
            }
        }
    }
}

#[test]
fn test_extract_handles() {
    assert_eq!(
        extract_handles("@alice, cc @bob_2 and mail@example.com"),
        vec!["@alice", "@bob_2", "@example"]
    );
    assert!(extract_handles("no handles here").is_empty());
}

#[test]
fn test_serialized_field_names() {
    let json = serde_json::to_value(classify("@carol thanks", "@bob", "")).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "isRegularPost": false,
            "isMention": true,
            "mentionTarget": "@carol",
            "isQuote": false,
            "quoteTarget": null,
            "isReply": true,
            "replyTarget": "@bob"
        })
    );
}
