use vireo_compiler::{EventRecorder, ParseEvent, ParserOptions, parse_html};
use vireo_dom::platform;

fn html_options() -> ParserOptions {
    ParserOptions {
        expect_html: true,
        is_unary_tag: platform::is_unary_tag,
        can_be_left_open_tag: platform::can_be_left_open_tag,
        ..ParserOptions::default()
    }
}

fn events(src: &str, options: &ParserOptions) -> EventRecorder {
    let mut rec = EventRecorder::default();
    parse_html(src, options, &mut rec);
    rec
}

/// Compact `+tag` / `-tag` / `"text"` rendering of the event stream.
fn trace(rec: &EventRecorder) -> Vec<String> {
    rec.events
        .iter()
        .filter_map(|e| match e {
            ParseEvent::Start { tag, unary: true, .. } => Some(format!("+{tag}/")),
            ParseEvent::Start { tag, .. } => Some(format!("+{tag}")),
            ParseEvent::End { tag, .. } => Some(format!("-{tag}")),
            ParseEvent::Chars { text } => Some(format!("{text:?}")),
            ParseEvent::Comment { text } => Some(format!("<!{text}>")),
            ParseEvent::Warn { .. } => None,
        })
        .collect()
}

#[test]
fn well_formed_nesting_mirrors_input() {
    let rec = events(
        r#"<div id="a"><ul><li>one</li><li>two</li></ul><span>x</span></div>"#,
        &html_options(),
    );
    assert_eq!(
        trace(&rec),
        vec![
            "+div", "+ul", "+li", "\"one\"", "-li", "+li", "\"two\"", "-li", "-ul", "+span",
            "\"x\"", "-span", "-div"
        ]
    );
    assert!(rec.warnings().is_empty());

    let mut depth = 0i32;
    for e in &rec.events {
        match e {
            ParseEvent::Start { unary: false, .. } => depth += 1,
            ParseEvent::End { .. } => depth -= 1,
            _ => {}
        }
        assert!(depth >= 0);
    }
    assert_eq!(depth, 0);
}

#[test]
fn missing_end_tag_warns_and_closes_both() {
    let rec = events("<div><span></div>", &html_options());
    assert_eq!(trace(&rec), vec!["+div", "+span", "-span", "-div"]);
    assert_eq!(rec.warnings(), vec!["tag <span> has no matching end tag."]);
}

#[test]
fn stray_p_end_tag_synthesizes_pair() {
    let rec = events("</p>", &html_options());
    assert_eq!(trace(&rec), vec!["+p", "-p"]);
    assert!(rec.warnings().is_empty());
}

#[test]
fn stray_br_end_tag_is_unary_start() {
    let rec = events("</br>", &ParserOptions::default());
    match rec.events.as_slice() {
        [ParseEvent::Start { tag, attrs, unary, .. }] => {
            assert_eq!(tag, "br");
            assert!(attrs.is_empty());
            assert!(*unary);
        }
        other => panic!("unexpected events {other:?}"),
    }
}

#[test]
fn other_stray_end_tags_are_dropped() {
    let rec = events("<div></span></div>", &html_options());
    assert_eq!(trace(&rec), vec!["+div", "-div"]);
    assert!(rec.warnings().is_empty());
}

#[test]
fn comments_are_skipped_unless_kept() {
    let rec = events("<!-- hi --><b>x</b>", &ParserOptions::default());
    assert_eq!(trace(&rec), vec!["+b", "\"x\"", "-b"]);

    let keep = ParserOptions {
        should_keep_comment: true,
        ..ParserOptions::default()
    };
    let rec = events("<!-- hi --><b>x</b>", &keep);
    assert_eq!(trace(&rec), vec!["<! hi >", "+b", "\"x\"", "-b"]);
}

#[test]
fn abruptly_closed_comments_are_empty() {
    let keep = ParserOptions {
        should_keep_comment: true,
        ..ParserOptions::default()
    };
    assert_eq!(trace(&events("<!-->", &keep)), vec!["<!>"]);
    assert_eq!(trace(&events("<!--->", &keep)), vec!["<!>"]);
    assert_eq!(trace(&events("<!---->", &keep)), vec!["<!>"]);

    let rec = events("<div><!--->x</div>", &keep);
    assert_eq!(trace(&rec), vec!["+div", "<!>", "\"x\"", "-div"]);
    assert!(rec.warnings().is_empty());

    let rec = events("<div><!--->x</div>", &ParserOptions::default());
    assert_eq!(trace(&rec), vec!["+div", "\"x\"", "-div"]);
}

#[test]
fn doctype_and_conditional_comments_are_consumed() {
    let rec = events(
        "<!DOCTYPE html><![if !IE]><p>a</p><![endif]>",
        &html_options(),
    );
    assert_eq!(trace(&rec), vec!["+p", "\"a\"", "-p"]);
}

#[test]
fn attributes_quoting_and_offsets() {
    let rec = events(r#"<a href='x' title="y z" data-n=3 hidden>"#, &html_options());
    let ParseEvent::Start { attrs, start, end, .. } = &rec.events[0] else {
        panic!("expected start");
    };
    let pairs: Vec<(&str, &str)> = attrs
        .iter()
        .map(|a| (a.name.as_str(), a.value.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("href", "x"), ("title", "y z"), ("data-n", "3"), ("hidden", "")]
    );
    assert_eq!((*start, attrs[0].start, attrs[0].end), (0, 3, 11));
    assert_eq!(*end, 40);
}

#[test]
fn newline_entities_decoded_only_when_requested() {
    let src = r#"<a href="a&#10;b" title="c&#10;d"></a>"#;
    let attr_values = |opts: &ParserOptions| -> Vec<String> {
        match &events(src, opts).events[0] {
            ParseEvent::Start { attrs, .. } => attrs.iter().map(|a| a.value.clone()).collect(),
            _ => panic!("expected start"),
        }
    };
    assert_eq!(attr_values(&ParserOptions::default()), vec!["a&#10;b", "c&#10;d"]);

    let href_only = ParserOptions {
        should_decode_newlines_for_href: true,
        ..ParserOptions::default()
    };
    assert_eq!(attr_values(&href_only), vec!["a\nb", "c&#10;d"]);

    let all = ParserOptions {
        should_decode_newlines: true,
        ..ParserOptions::default()
    };
    assert_eq!(attr_values(&all), vec!["a&#10;b", "c\nd"]);
}

#[test]
fn lone_angle_brackets_are_text() {
    let rec = events("<p>a < b <= c</p>", &html_options());
    assert_eq!(trace(&rec), vec!["+p", "\"a < b <= c\"", "-p"]);
}

#[test]
fn raw_text_elements_are_not_parsed() {
    let rec = events(
        "<div><script>if (a < b) { x('<p>') }</SCRIPT><textarea>\n<b>t</b></textarea></div>",
        &html_options(),
    );
    assert_eq!(
        trace(&rec),
        vec![
            "+div",
            "+script",
            "\"if (a < b) { x('<p>') }\"",
            "-script",
            "+textarea",
            "\"<b>t</b>\"",
            "-textarea",
            "-div"
        ]
    );
}

#[test]
fn pre_ignores_first_newline() {
    let rec = events("<pre>\nline</pre>", &html_options());
    assert_eq!(trace(&rec), vec!["+pre", "\"line\"", "-pre"]);
}

#[test]
fn implied_closing_of_p_and_left_open_tags() {
    let rec = events("<p>one<div>two</div><ul><li>a<li>b</ul>", &html_options());
    assert_eq!(
        trace(&rec),
        vec![
            "+p", "\"one\"", "-p", "+div", "\"two\"", "-div", "+ul", "+li", "\"a\"", "-li",
            "+li", "\"b\"", "-li", "-ul"
        ]
    );
    // closing an li implicitly is not an error; the final </ul> closes the open <li>
    assert_eq!(rec.warnings(), vec!["tag <li> has no matching end tag."]);
}

#[test]
fn unary_tags_do_not_open() {
    let rec = events("<div><img src=a><br/><input></div>", &html_options());
    assert_eq!(trace(&rec), vec!["+div", "+img/", "+br/", "+input/", "-div"]);
    assert!(rec.warnings().is_empty());
}

#[test]
fn unclosed_tags_are_flushed_at_end() {
    let rec = events("<div><p>text", &ParserOptions::default());
    assert_eq!(trace(&rec), vec!["+div", "+p", "\"text\"", "-p", "-div"]);
    assert_eq!(
        rec.warnings(),
        vec![
            "tag <p> has no matching end tag.",
            "tag <div> has no matching end tag."
        ]
    );
}

#[test]
fn malformed_tail_is_emitted_as_text() {
    let rec = events(r#"<div><span class="x"#, &ParserOptions::default());
    assert_eq!(trace(&rec), vec!["+div", "\"<span class=\\\"x\"", "-div"]);
    let warnings = rec.warnings();
    assert_eq!(
        warnings[0],
        r#"Mal-formatted tag at end of template: "<span class="x""#
    );
    assert_eq!(warnings[1], "tag <div> has no matching end tag.");
}

#[test]
fn repeated_parses_are_independent() {
    let src = "<div><script>1</script><p>x<p>y</div>";
    let first = events(src, &html_options()).events;
    let second = events(src, &html_options()).events;
    assert_eq!(first, second);
}
