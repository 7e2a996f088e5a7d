//! Tagged-response protocol parser.
//!
//! The model answers in free text with a fixed vocabulary of XML-ish tags.
//! Parsing is one tokenizing pass: every recognized element is located
//! once, then runs of adjacent elements are stripped together with an
//! optional wrapping code fence or backtick pair. Any other `<Name>` text,
//! fenced or not, is left untouched.

use crate::entity::decode_entities;
use crate::types::AgentAction;

// ─── Vocabulary ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    TmuxSendKeys,
    ExecCommand,
    PasteMultilineContent,
    ExecAndWait,
    RequestAccomplished,
    ExecPaneSeemsBusy,
    WaitingForUserResponse,
    NoComment,
}

impl Tag {
    pub const ALL: [Self; 8] = [
        Self::TmuxSendKeys,
        Self::ExecCommand,
        Self::PasteMultilineContent,
        Self::ExecAndWait,
        Self::RequestAccomplished,
        Self::ExecPaneSeemsBusy,
        Self::WaitingForUserResponse,
        Self::NoComment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TmuxSendKeys => "TmuxSendKeys",
            Self::ExecCommand => "ExecCommand",
            Self::PasteMultilineContent => "PasteMultilineContent",
            Self::ExecAndWait => "ExecAndWait",
            Self::RequestAccomplished => "RequestAccomplished",
            Self::ExecPaneSeemsBusy => "ExecPaneSeemsBusy",
            Self::WaitingForUserResponse => "WaitingForUserResponse",
            Self::NoComment => "NoComment",
        }
    }

    /// Case-sensitive lookup; anything outside the vocabulary is inert text.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            Self::RequestAccomplished
                | Self::ExecPaneSeemsBusy
                | Self::WaitingForUserResponse
                | Self::NoComment
        )
    }
}

// ─── Tokenizer ────────────────────────────────────────────────────

/// One recognized element, as a byte range of the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Element<'a> {
    tag: Tag,
    start: usize,
    end: usize,
    /// `None` for `<Tag/>` and for an unclosed `<Tag>`.
    body: Option<&'a str>,
}

const FENCE: &str = "```";

fn locate_elements(text: &str) -> Vec<Element<'_>> {
    let mut elements = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('<') {
        let start = pos + offset;
        let after = &text[start + 1..];
        let name_len = after
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after.len());
        let Some(tag) = Tag::from_name(&after[..name_len]) else {
            pos = start + 1;
            continue;
        };
        let tail = &after[name_len..];

        if tail.starts_with('>') {
            let body_start = start + 1 + name_len + 1;
            let close = format!("</{}>", tag.name());
            let close_at = text[body_start..]
                .find(&close)
                .filter(|&at| !tag.is_boolean() || is_flag_body(&text[body_start..body_start + at]));
            if let Some(close_at) = close_at {
                let body_end = body_start + close_at;
                let end = body_end + close.len();
                elements.push(Element {
                    tag,
                    start,
                    end,
                    body: Some(&text[body_start..body_end]),
                });
                pos = end;
            } else if tag.is_boolean() {
                // Bare marker such as "```<ExecPaneSeemsBusy>```". A later
                // close tag of the same name belongs to its own element.
                elements.push(Element {
                    tag,
                    start,
                    end: body_start,
                    body: None,
                });
                pos = body_start;
            } else {
                pos = body_start;
            }
        } else if let Some(rest) = tail.trim_start_matches(' ').strip_prefix("/>") {
            let end = text.len() - rest.len();
            elements.push(Element {
                tag,
                start,
                end,
                body: None,
            });
            pos = end;
        } else {
            pos = start + 1;
        }
    }

    elements
}

/// Group elements separated only by whitespace and widen each group over a
/// wrapping fence or backtick pair. Returns non-overlapping byte ranges.
fn removal_ranges(text: &str, elements: &[Element<'_>]) -> Vec<(usize, usize)> {
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for el in elements {
        match groups.last_mut() {
            Some(last) if text[last.1..el.start].trim().is_empty() => last.1 = el.end,
            _ => groups.push((el.start, el.end)),
        }
    }

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (start, end) in groups {
        let (mut start, end) = widen_over_fence(text, start, end)
            .or_else(|| widen_over_backticks(text, start, end))
            .unwrap_or((start, end));
        if let Some(prev) = ranges.last() {
            start = start.max(prev.1);
        }
        ranges.push((start, end));
    }
    ranges
}

fn widen_over_fence(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let before = text[..start].trim_end();
    let before = before.trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let open = before.strip_suffix(FENCE)?;
    // An odd number of fences before this one means it closes an earlier block.
    if open.matches(FENCE).count() % 2 != 0 {
        return None;
    }

    let after = text[end..].trim_start();
    if !after.starts_with(FENCE) {
        return None;
    }
    let close_end = text.len() - after.len() + FENCE.len();
    Some((open.len(), close_end))
}

fn widen_over_backticks(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let before = &text[..start];
    let after = &text[end..];
    let single_before = before.ends_with('`') && !before.ends_with("``");
    let single_after = after.starts_with('`') && !after.starts_with("``");
    (single_before && single_after).then(|| (start - 1, end + 1))
}

// ─── Message cleanup ──────────────────────────────────────────────

/// Remove `ranges` and drop the lines they leave blank.
fn strip_ranges(text: &str, ranges: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut markers = Vec::with_capacity(ranges.len());
    let mut cursor = 0;
    for &(start, end) in ranges {
        out.push_str(&text[cursor..start]);
        markers.push(out.len());
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    let mut kept: Vec<&str> = Vec::new();
    let mut line_start = 0;
    for line in out.split('\n') {
        let line_end = line_start + line.len();
        let touched = markers.iter().any(|&m| m >= line_start && m <= line_end);
        if !(touched && line.trim().is_empty()) {
            kept.push(line);
        }
        line_start = line_end + 1;
    }

    let mut collapsed: Vec<&str> = Vec::with_capacity(kept.len());
    for line in kept {
        let blank = line.trim().is_empty();
        let prev_blank = collapsed.last().is_some_and(|l| l.trim().is_empty());
        if !(blank && prev_blank) {
            collapsed.push(line);
        }
    }
    collapsed.join("\n").trim().to_string()
}

/// Longest body a boolean element may carry. Anything longer, or spanning
/// lines, is prose between a bare marker and a later element.
const MAX_FLAG_BODY: usize = 16;

fn is_flag_body(body: &str) -> bool {
    !body.contains('\n') && body.trim().len() <= MAX_FLAG_BODY
}

// ─── Entry point ──────────────────────────────────────────────────

/// Parse a raw model response. Never fails: a response without recognized
/// tags yields an action carrying only the message.
pub fn parse_response(response: &str) -> AgentAction {
    let elements = locate_elements(response);
    let mut action = AgentAction::default();

    for el in &elements {
        let value = || decode_entities(el.body.unwrap_or_default().trim());
        match el.tag {
            Tag::TmuxSendKeys => action.send_keys.push(value()),
            Tag::ExecCommand => action.exec_command.push(value()),
            Tag::PasteMultilineContent => action.paste_multiline_content = value(),
            Tag::ExecAndWait => action.exec_and_wait = value(),
            Tag::RequestAccomplished => action.request_accomplished = true,
            Tag::ExecPaneSeemsBusy => action.exec_pane_seems_busy = true,
            Tag::WaitingForUserResponse => action.waiting_for_user_response = true,
            Tag::NoComment => action.no_comment = true,
        }
    }

    action.message = if elements.is_empty() {
        response.trim().to_string()
    } else {
        strip_ranges(response, &removal_ranges(response, &elements))
    };
    action
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_for_user_response_inline() {
        let got = parse_response(
            "Just let me know what you'd like me to do. <WaitingForUserResponse>1</WaitingForUserResponse>",
        );
        let want = AgentAction {
            message: "Just let me know what you'd like me to do.".into(),
            waiting_for_user_response: true,
            ..Default::default()
        };
        assert_eq!(got, want);
    }

    #[test]
    fn request_accomplished_in_xml_code_block() {
        let got = parse_response(
            "Here is some lines and than the tag.\n```xml\n<RequestAccomplished>1</RequestAccomplished>\n```",
        );
        let want = AgentAction {
            message: "Here is some lines and than the tag.".into(),
            request_accomplished: true,
            ..Default::default()
        };
        assert_eq!(got, want);
    }

    #[test]
    fn multiple_tags_mixed_content() {
        let got = parse_response(
            "Here is some lines and than the tag.\n```\n<TmuxSendKeys>SOmething</TmuxSendKeys>\n```\nMore content\n```<ExecPaneSeemsBusy>```",
        );
        let want = AgentAction {
            message: "Here is some lines and than the tag.\nMore content".into(),
            send_keys: vec!["SOmething".into()],
            exec_pane_seems_busy: true,
            ..Default::default()
        };
        assert_eq!(got, want);
    }

    #[test]
    fn repeated_send_keys_append_in_order() {
        let got = parse_response("<TmuxSendKeys>foo</TmuxSendKeys><TmuxSendKeys>bar</TmuxSendKeys>");
        assert_eq!(got.send_keys, vec!["foo", "bar"]);
        assert_eq!(got.message, "");
    }

    #[test]
    fn message_only() {
        let got = parse_response("Just a message with no tags.");
        assert_eq!(got.message, "Just a message with no tags.");
        assert!(got.is_plain_message());
    }

    #[test]
    fn tag_only() {
        let got = parse_response("<RequestAccomplished>1</RequestAccomplished>");
        assert!(got.request_accomplished);
        assert_eq!(got.message, "");
    }

    #[test]
    fn tag_with_surrounding_whitespace() {
        let got = parse_response("Some text\n\n<RequestAccomplished> 1 </RequestAccomplished>\n");
        assert_eq!(got.message, "Some text");
        assert!(got.request_accomplished);
    }

    #[test]
    fn no_comment_inline() {
        let got = parse_response("Some text <NoComment>1</NoComment>");
        assert_eq!(got.message, "Some text");
        assert!(got.no_comment);
    }

    #[test]
    fn multiline_send_keys() {
        let got = parse_response("<TmuxSendKeys>line1\nline2</TmuxSendKeys>");
        assert_eq!(got.send_keys, vec!["line1\nline2"]);
    }

    #[test]
    fn backtick_wrapped_tag() {
        let got = parse_response("`<RequestAccomplished>1</RequestAccomplished>`");
        assert!(got.request_accomplished);
        assert_eq!(got.message, "");
    }

    #[test]
    fn unrecognized_tags_and_fences_preserved() {
        let input = "This is a message with a code block:\n```\n<NotAIResponse>foo</NotAIResponse>\n```\nAnd a backtick: `<OtherTag>bar</OtherTag>`";
        let got = parse_response(input);
        assert_eq!(got, AgentAction {
            message: input.into(),
            ..Default::default()
        });
    }

    #[test]
    fn unrecognized_tag_message_is_trimmed_input() {
        let input = "\n  see <execcommand>ls</execcommand>\n\n\n\nbye  \n";
        let got = parse_response(input);
        assert_eq!(got.message, input.trim());
        assert!(got.exec_command.is_empty());
    }

    #[test]
    fn entities_decoded_in_values() {
        let got = parse_response(
            "<TmuxSendKeys>foo &amp; bar &lt;baz&gt; &quot;qux&quot; &apos;zap&apos;</TmuxSendKeys>",
        );
        assert_eq!(got.send_keys, vec![r#"foo & bar <baz> "qux" 'zap'"#]);
    }

    #[test]
    fn mixed_encoded_and_raw_ampersands() {
        let got = parse_response("<TmuxSendKeys>foo &amp; bar & baz</TmuxSendKeys>");
        assert_eq!(got.send_keys, vec!["foo & bar & baz"]);
    }

    #[test]
    fn multiline_entities() {
        let got = parse_response("<TmuxSendKeys>line1 &lt;tag&gt;\nline2 &amp; more</TmuxSendKeys>");
        assert_eq!(got.send_keys, vec!["line1 <tag>\nline2 & more"]);
    }

    #[test]
    fn mixed_recognized_and_unrecognized() {
        let got = parse_response(
            "Message before.\n<TmuxSendKeys>foo</TmuxSendKeys>\n```\n<NotAIResponse>foo</NotAIResponse>\n```\n<MessageTag>bar</MessageTag>\n<RequestAccomplished>1</RequestAccomplished>\nAfter.",
        );
        let want = AgentAction {
            message: "Message before.\n```\n<NotAIResponse>foo</NotAIResponse>\n```\n<MessageTag>bar</MessageTag>\nAfter.".into(),
            send_keys: vec!["foo".into()],
            request_accomplished: true,
            ..Default::default()
        };
        assert_eq!(got, want);
    }

    #[test]
    fn self_closing_and_empty_booleans() {
        assert!(parse_response("done <RequestAccomplished/>").request_accomplished);
        assert!(parse_response("done <RequestAccomplished />").request_accomplished);
        assert!(parse_response("<NoComment></NoComment>").no_comment);
        assert!(parse_response("```\n<NoComment/>\n```").no_comment);
        assert_eq!(parse_response("ok\n```\n<NoComment/>\n```").message, "ok");
    }

    #[test]
    fn boolean_presence_sets_flag_whatever_the_body() {
        let got = parse_response("Not yet.\n<RequestAccomplished>0</RequestAccomplished>");
        assert!(got.request_accomplished);
        assert_eq!(got.message, "Not yet.");
        let got = parse_response("<ExecPaneSeemsBusy>false</ExecPaneSeemsBusy>");
        assert!(got.exec_pane_seems_busy);
    }

    #[test]
    fn bare_marker_does_not_swallow_prose_before_later_element() {
        let got = parse_response(
            "```<ExecPaneSeemsBusy>```\nThe build is still running, I will check again.\n<ExecPaneSeemsBusy>1</ExecPaneSeemsBusy>",
        );
        let want = AgentAction {
            message: "The build is still running, I will check again.".into(),
            exec_pane_seems_busy: true,
            ..Default::default()
        };
        assert_eq!(got, want);
    }

    #[test]
    fn bare_marker_then_inline_prose_on_same_line() {
        let got = parse_response(
            "`<NoComment>` nothing new on screen, carry on <NoComment>1</NoComment>",
        );
        assert!(got.no_comment);
        assert_eq!(got.message, "nothing new on screen, carry on");
    }

    #[test]
    fn single_valued_tags_keep_last() {
        let got = parse_response(
            "<PasteMultilineContent>a</PasteMultilineContent>\n<PasteMultilineContent>b\nc</PasteMultilineContent>",
        );
        assert_eq!(got.paste_multiline_content, "b\nc");
    }

    #[test]
    fn exec_and_wait_value() {
        let got = parse_response("Building now.\n<ExecAndWait>make -j4 &amp;&amp; make test</ExecAndWait>");
        assert_eq!(got.exec_and_wait, "make -j4 && make test");
        assert_eq!(got.message, "Building now.");
    }

    #[test]
    fn fence_with_several_tags() {
        let got = parse_response(
            "Running both.\n```xml\n<ExecCommand>cd /tmp</ExecCommand>\n<ExecCommand>ls</ExecCommand>\n```\nThen I check.",
        );
        assert_eq!(got.exec_command, vec!["cd /tmp", "ls"]);
        assert_eq!(got.message, "Running both.\nThen I check.");
    }

    #[test]
    fn fence_closing_an_earlier_block_is_not_consumed() {
        let got = parse_response("```\ncode\n```\n<ExecCommand>ls</ExecCommand>\n```\nmore\n```");
        assert_eq!(got.exec_command, vec!["ls"]);
        assert_eq!(got.message, "```\ncode\n```\n```\nmore\n```");
    }

    #[test]
    fn case_sensitive_vocabulary() {
        let got = parse_response("<execcommand>ls</execcommand> <EXECCOMMAND>ls</EXECCOMMAND>");
        assert!(got.exec_command.is_empty());
    }

    #[test]
    fn unclosed_value_tag_is_left_alone() {
        let got = parse_response("try <ExecCommand>ls");
        assert!(got.exec_command.is_empty());
        assert_eq!(got.message, "try <ExecCommand>ls");
    }

    #[test]
    fn stripped_lines_collapse_blank_runs() {
        let got = parse_response("First.\n\n<ExecCommand>ls</ExecCommand>\n\n\nSecond.");
        assert_eq!(got.message, "First.\n\nSecond.");
    }

    #[test]
    fn tag_lookup_roundtrip() {
        for tag in Tag::ALL {
            assert_eq!(Tag::from_name(tag.name()), Some(tag));
        }
        assert_eq!(Tag::from_name("SendKeys"), None);
    }
}
