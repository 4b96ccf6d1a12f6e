use std::fs;
use std::path::PathBuf;

use vireo_cli::{EmitMode, TemplateArgs, compile_file, parse_delimiters, parse_file, write_output};
use vireo_compiler::ParseEvent;

const SFC: &str = r#"<template>
  <div class="counter">
    <button @click="inc">Increment</button>
    <span>{{ count }}</span>
  </div>
</template>
<script>
export default {}
</script>
<style>
.counter { color: red; }
</style>
"#;

fn scratch(name: &str, contents: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../target/vireo-cli-tests")
        .join(format!("{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write input");
    path
}

#[test]
fn compile_emits_render_source_for_sfc() {
    let input = scratch("Counter.vue", SFC);
    let report = compile_file(&input, EmitMode::Render, &TemplateArgs::default()).expect("compile");
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.output.contains("pub fn render(vm: &vireo_core::Instance)"));
    assert!(report.output.contains("\"count\""));
    assert!(!report.output.contains("color: red"));

    let out_dir = input.parent().expect("dir").join("gen");
    let path = write_output(&input, &out_dir, EmitMode::Render, &report.output).expect("write");
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("Counter.rs"));
    assert_eq!(fs::read_to_string(path).expect("read back"), report.output);
}

#[test]
fn compile_json_includes_diagnostics() {
    let input = scratch("broken.html", "<div>{{ a + }}</div>");
    let report = compile_file(&input, EmitMode::Json, &TemplateArgs::default()).expect("compile");
    let json: serde_json::Value = serde_json::from_str(&report.output).expect("valid json");
    assert!(json["render"].is_string());
    assert!(json["ast"].is_array());
    if cfg!(debug_assertions) {
        assert!(!report.errors.is_empty());
        assert_eq!(json["errors"].as_array().map(Vec::len), Some(report.errors.len()));
    }
}

#[test]
fn custom_delimiters_are_honored() {
    let input = scratch("delims.html", "<p>[[ name ]]</p>");
    let args = TemplateArgs {
        delimiters: Some(parse_delimiters("[[,]]").expect("delimiters")),
        ..Default::default()
    };
    let report = compile_file(&input, EmitMode::Render, &args).expect("compile");
    assert!(report.output.contains("\"name\""));
    assert!(parse_delimiters("[[").is_err());
}

#[test]
fn sfc_without_template_is_an_error() {
    let input = scratch("Empty.vue", "<script>\nexport default {}\n</script>\n");
    let err = compile_file(&input, EmitMode::Render, &TemplateArgs::default()).unwrap_err();
    assert!(err.to_string().contains("has no <template> block"));
}

#[test]
fn missing_input_reports_the_path() {
    let input = PathBuf::from("does/not/exist.html");
    let err = compile_file(&input, EmitMode::Render, &TemplateArgs::default()).unwrap_err();
    assert!(err.to_string().contains("does/not/exist.html"));
}

#[test]
fn parse_streams_tokenizer_events() {
    let input = scratch("list.html", "<ul><li>a<li>b</ul><!-- note -->");
    let events = parse_file(&input, &TemplateArgs::default()).expect("parse");
    let starts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ParseEvent::Start { tag, .. } => Some(tag.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(starts, vec!["ul", "li", "li"]);
    assert!(!events.iter().any(|e| matches!(e, ParseEvent::Comment { .. })));

    let with_comments = TemplateArgs {
        comments: true,
        ..Default::default()
    };
    let events = parse_file(&input, &with_comments).expect("parse");
    assert!(events.iter().any(|e| matches!(e, ParseEvent::Comment { .. })));
}
