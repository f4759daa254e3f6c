//! End-to-end checker tests: parse a template, check it against a fixture
//! package, and assert on the diagnostics.

use std::collections::BTreeMap;

use tmpl_common::{Diagnostic, DiagnosticEmitter, DiagnosticSink, SourceManager};
use tmpl_syntax::parse;

use super::{add_trees, CheckOptions, Checker, NamedTreeMap};
use crate::errors::TypeError;
use crate::loader::RegistryLoader;
use crate::store::TypeStore;
use crate::typ::{BasicType, Field, Method};

const PKG: &str = "example.com/p";

/// Builds the fixture package:
///
/// ```text
/// type Dot1 struct {
///     Foo   string
///     Inner Dot1Inner
///     Slice []Dot1ContainedValue
///     Map   map[string]Dot1ContainedValue
///     Func1 func(n int, s string) FuncResult
///     Intf  Dot1InnerInterface
///     Dot1Embedded
/// }
/// func (Dot1) Method() string
/// ```
fn fixture() -> (TypeStore, RegistryLoader) {
    let mut store = TypeStore::new();
    let mut loader = RegistryLoader::new();

    let str_t = store.basic(BasicType::Str);
    let int_t = store.basic(BasicType::Int);
    let bool_t = store.basic(BasicType::Bool);

    let field = |name: &str, typ| Field {
        name: name.to_string(),
        typ,
        embedded: false,
    };

    let dot1 = store.new_named(format!("{}.Dot1", PKG));
    let inner = store.new_named(format!("{}.Dot1Inner", PKG));
    let contained = store.new_named(format!("{}.Dot1ContainedValue", PKG));
    let embedded = store.new_named(format!("{}.Dot1Embedded", PKG));
    let embedded_inner = store.new_named(format!("{}.Dot1EmbeddedInner", PKG));
    let intf = store.new_named(format!("{}.Dot1InnerInterface", PKG));
    let func_result = store.new_named(format!("{}.FuncResult", PKG));

    let inner_struct = store.new_struct(vec![field("InnerField", int_t)]);
    store.set_underlying(inner, inner_struct);

    let contained_struct = store.new_struct(vec![field("Value", bool_t)]);
    store.set_underlying(contained, contained_struct);

    let embedded_inner_struct = store.new_struct(vec![field("EmbeddedInnerField", str_t)]);
    store.set_underlying(embedded_inner, embedded_inner_struct);

    let embedded_struct = store.new_struct(vec![field("EmbeddedInner", embedded_inner)]);
    store.set_underlying(embedded, embedded_struct);

    let inner_method_sig = store.new_signature(vec![], vec![inner], false);
    let intf_underlying = store.new_interface(vec![Method {
        name: "InnerMethod".to_string(),
        sig: inner_method_sig,
    }]);
    store.set_underlying(intf, intf_underlying);

    let func_result_struct = store.new_struct(vec![field("ResultField", str_t)]);
    store.set_underlying(func_result, func_result_struct);

    let func1 = store.new_signature(vec![int_t, str_t], vec![func_result], false);
    let slice_t = store.new_slice(contained);
    let map_t = store.new_map(str_t, contained);

    let dot1_struct = store.new_struct(vec![
        field("Foo", str_t),
        field("Inner", inner),
        field("Slice", slice_t),
        field("Map", map_t),
        field("Func1", func1),
        field("Intf", intf),
        Field {
            name: "Dot1Embedded".to_string(),
            typ: embedded,
            embedded: true,
        },
    ]);
    store.set_underlying(dot1, dot1_struct);
    let method_sig = store.new_signature(vec![], vec![str_t], false);
    store.add_method(dot1, "Method", method_sig);

    for (name, key) in [
        ("Dot1", dot1),
        ("Dot1Inner", inner),
        ("Dot1ContainedValue", contained),
        ("Dot1Embedded", embedded),
        ("Dot1EmbeddedInner", embedded_inner),
        ("Dot1InnerInterface", intf),
        ("FuncResult", func_result),
    ] {
        loader.register_type(format!("{}.{}", PKG, name), key);
    }

    (store, loader)
}

fn run_opts(source: &str, opts: CheckOptions, custom_func: bool) -> DiagnosticSink {
    let (mut store, mut loader) = fixture();

    let mut sources = SourceManager::new();
    let file = sources.add_file("test.tmpl", source);
    let set = parse("test.tmpl", source).expect("template should parse");
    let mut trees = NamedTreeMap::new();
    add_trees(&mut trees, file, set).expect("unique template names");

    let mut func_map = BTreeMap::new();
    if custom_func {
        let str_t = store.basic(BasicType::Str);
        let sig = store.new_signature(vec![], vec![str_t], false);
        func_map.insert("customFunc".to_string(), sig);
    }

    Checker::new(&mut store, &mut loader, &sources, &trees, opts)
        .with_func_map(func_map)
        .check("test.tmpl", None)
        .expect("entry template exists")
}

fn run(source: &str) -> DiagnosticSink {
    run_opts(source, CheckOptions::default(), false)
}

fn assert_clean(sink: &DiagnosticSink) {
    assert!(
        sink.is_empty(),
        "expected no diagnostics, got: {:?}",
        sink.iter().map(|d| d.message.clone()).collect::<Vec<_>>()
    );
}

fn single_error(sink: &DiagnosticSink) -> &Diagnostic {
    assert_eq!(
        sink.len(),
        1,
        "expected exactly one diagnostic, got: {:?}",
        sink.iter().map(|d| d.message.clone()).collect::<Vec<_>>()
    );
    sink.diagnostics().first().unwrap()
}

const ANNOT: &str = "{{/* @type example.com/p.Dot1 */}}";

// ----------------------------------------------------------------------
// Field access

#[test]
fn test_valid_field() {
    assert_clean(&run(&format!("{}{{{{.Foo}}}}", ANNOT)));
}

#[test]
fn test_no_type_annotation_is_silent() {
    // Without a dot there is nothing to check against.
    assert_clean(&run("{{.Foo}}{{.Inner.InnerField}}"));
}

#[test]
fn test_nonexistent_field() {
    let sink = run(&format!("{}{{{{.Foo}}}}{{{{.Bar}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::NoSuchField.code()));
    assert!(diag.message.contains("Bar"), "{}", diag.message);
    assert!(diag.message.contains("example.com/p.Dot1"), "{}", diag.message);
}

#[test]
fn test_nested_field() {
    assert_clean(&run(&format!("{}{{{{.Inner.InnerField}}}}", ANNOT)));
}

#[test]
fn test_nested_field_through_non_struct() {
    let sink = run(&format!("{}{{{{.Inner.InnerField.InnerInnerField}}}}", ANNOT));
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field InnerInnerField in type int"),
        "{}",
        diag.message
    );
}

#[test]
fn test_nonexistent_type_annotation() {
    let sink = run("{{/* @type example.com/p.InvalidType */}}{{.Foo}}");
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::TypeLoadFailed.code()));
    assert!(
        diag.message.contains("cannot load type example.com/p.InvalidType"),
        "{}",
        diag.message
    );
}

#[test]
fn test_multiple_type_annotations() {
    let sink = run(&format!("{}{}{{{{.Foo}}}}", ANNOT, ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::MultipleTypeAnnotations.code()));
}

// ----------------------------------------------------------------------
// Methods, interfaces, embedding

#[test]
fn test_method_call() {
    assert_clean(&run(&format!("{}{{{{.Method}}}}", ANNOT)));
}

#[test]
fn test_interface_method_chain() {
    assert_clean(&run(&format!("{}{{{{.Intf.InnerMethod.InnerField}}}}", ANNOT)));
}

#[test]
fn test_embedded_promotion() {
    assert_clean(&run(&format!(
        "{}{{{{.EmbeddedInner.EmbeddedInnerField}}}}",
        ANNOT
    )));
}

#[test]
fn test_field_with_arguments() {
    let sink = run(&format!("{}{{{{.Foo 1 2}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::FieldTakesNoArgs.code()));
}

// ----------------------------------------------------------------------
// with

#[test]
fn test_with_narrows_dot() {
    assert_clean(&run(&format!(
        "{}{{{{with .Inner}}}}{{{{.InnerField}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_with_invalid_inner_field() {
    let sink = run(&format!(
        "{}{{{{with .Inner}}}}{{{{.Invalid}}}}{{{{end}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field Invalid in type example.com/p.Dot1Inner"),
        "{}",
        diag.message
    );
}

#[test]
fn test_with_else_keeps_outer_dot() {
    let sink = run(&format!(
        "{}{{{{with .Inner}}}}{{{{.InnerField}}}}{{{{else}}}}{{{{.InnerField}}}}{{{{end}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field InnerField in type example.com/p.Dot1"),
        "{}",
        diag.message
    );
}

#[test]
fn test_annotation_inside_with() {
    assert_clean(&run(
        "{{with .Inner}}{{/* @type example.com/p.Dot1Inner */}}{{.InnerField}}{{end}}",
    ));
}

#[test]
fn test_annotation_inside_with_invalid() {
    let sink = run(
        "{{with .Inner}}{{/* @type example.com/p.Dot1Inner */}}{{.NonExistent}}{{end}}",
    );
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field NonExistent in type example.com/p.Dot1Inner"),
        "{}",
        diag.message
    );
}

#[test]
fn test_dollar_refers_to_top_dot() {
    assert_clean(&run(&format!(
        "{}{{{{with .Inner}}}}{{{{.InnerField}}}}{{{{$.Inner.InnerField}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_dollar_invalid_field() {
    let sink = run(&format!(
        "{}{{{{with .Inner}}}}{{{{.InnerField}}}}{{{{$.InvalidKey}}}}{{{{end}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field InvalidKey in type example.com/p.Dot1"),
        "{}",
        diag.message
    );
}

// ----------------------------------------------------------------------
// range

#[test]
fn test_range_slice() {
    assert_clean(&run(&format!(
        "{}{{{{range .Slice}}}}{{{{.Value}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_range_not_iterable() {
    let sink = run(&format!(
        "{}{{{{range .Foo}}}}{{{{.Value}}}}{{{{end}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::RangeNotIterable.code()));
    assert!(diag.message.contains("string"), "{}", diag.message);
    assert!(diag.message.contains(".Foo"), "{}", diag.message);
}

#[test]
fn test_range_map() {
    assert_clean(&run(&format!(
        "{}{{{{range .Map}}}}{{{{.Value}}}}{{{{/* @debug show . */}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_range_map_invalid_elem_field() {
    let sink = run(&format!(
        "{}{{{{range .Map}}}}{{{{.InvalidField}}}}{{{{end}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert!(
        diag.message
            .contains("can't evaluate field InvalidField in type example.com/p.Dot1ContainedValue"),
        "{}",
        diag.message
    );
}

#[test]
fn test_range_two_variable_declaration() {
    assert_clean(&run(&format!(
        "{}{{{{range $i, $item := .Slice}}}}{{{{$i}}}}:{{{{$item.Value}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_range_one_variable_declaration() {
    assert_clean(&run(&format!(
        "{}{{{{range $item := .Slice}}}}{{{{$item.Value}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_range_two_variable_assignment() {
    assert_clean(&run(&format!(
        "{}{{{{ $i := \"\" }}}}{{{{ $item := \"\" }}}}\
         {{{{range $i, $item = .Slice}}}}{{{{$i}}}}:{{{{$item.Value}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_range_one_variable_assignment() {
    assert_clean(&run(&format!(
        "{}{{{{ $item := \"\" }}}}{{{{range $item = .Slice}}}}{{{{$item.Value}}}}{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_range_variables_out_of_scope_after_end() {
    let sink = run(&format!(
        "{}{{{{range $i, $v := .Slice}}}}{{{{end}}}}{{{{$i}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::UndefinedVariable.code()));
    assert!(diag.message.contains("$i"), "{}", diag.message);
}

#[test]
fn test_range_variable_key_and_elem_types() {
    // $i is an index; indexing a slice with it is fine, with .Foo it is not.
    let sink = run(&format!(
        "{}{{{{range $i, $v := .Slice}}}}{{{{index $.Slice $i}}}}{{{{$v.Missing}}}}{{{{end}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert!(diag.message.contains("Missing"), "{}", diag.message);
    assert!(
        diag.message.contains("example.com/p.Dot1ContainedValue"),
        "{}",
        diag.message
    );
}

// ----------------------------------------------------------------------
// Map dot-key access

#[test]
fn test_map_key_access_yields_value_type() {
    let sink = run(&format!("{}{{{{.Map.foo.InvalidField}}}}", ANNOT));
    let diag = single_error(&sink);
    assert!(
        diag.message
            .contains("can't evaluate field InvalidField in type example.com/p.Dot1ContainedValue"),
        "{}",
        diag.message
    );
}

// ----------------------------------------------------------------------
// Builtins

#[test]
fn test_builtin_index() {
    assert_clean(&run(&format!("{}{{{{index .Map \"foo\"}}}}", ANNOT)));
}

#[test]
fn test_builtin_index_chain() {
    assert_clean(&run(&format!("{}{{{{(index .Map \"foo\").Value}}}}", ANNOT)));
}

#[test]
fn test_builtin_index_chain_invalid_field() {
    let sink = run(&format!("{}{{{{(index .Map \"foo\").InvalidKey}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::NoSuchField.code()));
    assert!(diag.message.contains("InvalidKey"), "{}", diag.message);
    assert!(
        diag.message.contains("example.com/p.Dot1ContainedValue"),
        "{}",
        diag.message
    );
}

#[test]
fn test_builtin_index_key_mismatch() {
    let sink = run(&format!("{}{{{{index .Map 1}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::InvalidArg.code()));
}

#[test]
fn test_builtin_index_not_indexable() {
    let sink = run(&format!("{}{{{{index .Inner \"x\"}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::NotIndexable.code()));
}

#[test]
fn test_builtin_len() {
    let sink = run(&format!(
        "{}{{{{len \"foobar\"}}}}{{{{len .Slice}}}}{{{{len .Map}}}}{{{{len .Inner}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::InvalidArg.code()));
    assert!(
        diag.message
            .contains("function len: invalid argument type example.com/p.Dot1Inner"),
        "{}",
        diag.message
    );
}

#[test]
fn test_builtin_len_through_pipe() {
    assert_clean(&run(&format!("{}{{{{.Foo | len}}}}", ANNOT)));
    let sink = run(&format!("{}{{{{.Inner | len}}}}", ANNOT));
    assert_eq!(single_error(&sink).code, Some(TypeError::InvalidArg.code()));
}

#[test]
fn test_builtin_call() {
    assert_clean(&run(&format!(
        "{}{{{{(call .Func1 1 \"x\").ResultField}}}}",
        ANNOT
    )));
}

#[test]
fn test_builtin_call_non_function() {
    let sink = run(&format!("{}{{{{call .Foo}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::InvalidArg.code()));
}

#[test]
fn test_builtin_logicals_and_comparisons() {
    assert_clean(&run(&format!(
        "{}{{{{if and (eq .Foo \"a\") (not (lt 1 2))}}}}x{{{{end}}}}",
        ANNOT
    )));
}

#[test]
fn test_builtin_escapers_yield_string() {
    // html returns a string, so its result can feed len.
    assert_clean(&run(&format!("{}{{{{.Foo | html | len}}}}", ANNOT)));
}

#[test]
fn test_builtin_argument_error_not_doubled() {
    // The bad field is reported once; index itself stays silent.
    let sink = run(&format!("{}{{{{index .Map .Missing}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::NoSuchField.code()));
}

// ----------------------------------------------------------------------
// Functions

#[test]
fn test_custom_func_argument_checked() {
    let sink = run_opts(
        &format!("{}{{{{customFunc .InvalidKey}}}}", ANNOT),
        CheckOptions::default(),
        true,
    );
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field InvalidKey in type example.com/p.Dot1"),
        "{}",
        diag.message
    );
}

#[test]
fn test_unknown_function_reported() {
    let sink = run(&format!("{}{{{{mystery .Foo}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::UndefinedFunction.code()));
}

#[test]
fn test_unknown_function_downgraded_when_soft() {
    let opts = CheckOptions {
        allow_undefined_funcs: true,
        allow_undefined_templates: true,
        ..CheckOptions::default()
    };
    let sink = run_opts(&format!("{}{{{{mystery .Foo}}}}", ANNOT), opts, false);
    assert_eq!(sink.len(), 1);
    assert!(!sink.has_errors(), "soft mode downgrades to warning");
}

// ----------------------------------------------------------------------
// Templates

#[test]
fn test_template_invocation_types_subtemplate() {
    assert_clean(&run(&format!(
        "{{{{define \"sub\"}}}}{{{{.InnerField}}}}{{{{end}}}}{}{{{{template \"sub\" .Inner}}}}",
        ANNOT
    )));
}

#[test]
fn test_template_invocation_invalid_field_in_subtemplate() {
    let sink = run(&format!(
        "{{{{define \"sub\"}}}}{{{{.InvalidKey}}}}{{{{end}}}}{}{{{{template \"sub\" .Inner}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field InvalidKey in type example.com/p.Dot1Inner"),
        "{}",
        diag.message
    );
}

#[test]
fn test_template_undefined() {
    let sink = run(&format!("{}{{{{template \"nope\" .}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::UndefinedTemplate.code()));
}

#[test]
fn test_template_undefined_downgraded_when_soft() {
    let opts = CheckOptions {
        allow_undefined_funcs: true,
        allow_undefined_templates: true,
        ..CheckOptions::default()
    };
    let sink = run_opts(&format!("{}{{{{template \"nope\" .}}}}", ANNOT), opts, false);
    assert_eq!(sink.len(), 1);
    assert!(!sink.has_errors());
}

#[test]
fn test_recursive_template_terminates() {
    assert_clean(&run(&format!(
        "{{{{define \"rec\"}}}}{{{{template \"rec\" .}}}}{{{{end}}}}{}{{{{template \"rec\" .Inner}}}}",
        ANNOT
    )));
}

#[test]
fn test_mutually_recursive_templates_terminate() {
    assert_clean(&run(
        "{{define \"a\"}}{{template \"b\" .}}{{end}}\
         {{define \"b\"}}{{template \"a\" .}}{{end}}\
         {{template \"a\" .}}",
    ));
}

#[test]
fn test_define_only_tree_with_annotation_is_checked() {
    // Nothing invokes "lone", but it annotates its own dot, so it is walked
    // after the entry template.
    let sink = run(
        "{{define \"lone\"}}{{/* @type example.com/p.Dot1Inner */}}{{.Missing}}{{end}}ok",
    );
    let diag = single_error(&sink);
    assert!(
        diag.message.contains("can't evaluate field Missing in type example.com/p.Dot1Inner"),
        "{}",
        diag.message
    );
}

// ----------------------------------------------------------------------
// Chains and nil

#[test]
fn test_indirection_through_nil() {
    let sink = run(&format!("{}{{{{nil.Foo}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::IndirectionThroughNil.code()));
}

#[test]
fn test_parenthesised_pipeline_chain() {
    assert_clean(&run(&format!("{}{{{{(.Inner).InnerField}}}}", ANNOT)));
}

// ----------------------------------------------------------------------
// Variables

#[test]
fn test_undefined_variable() {
    let sink = run(&format!("{}{{{{$nope.Foo}}}}", ANNOT));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::UndefinedVariable.code()));
    assert!(diag.message.contains("$nope"), "{}", diag.message);
}

#[test]
fn test_variable_declaration_and_use() {
    assert_clean(&run(&format!(
        "{}{{{{$inner := .Inner}}}}{{{{$inner.InnerField}}}}",
        ANNOT
    )));
}

#[test]
fn test_variable_declared_in_with_scopes_to_body() {
    let sink = run(&format!(
        "{}{{{{with $x := .Inner}}}}{{{{$x.InnerField}}}}{{{{end}}}}{{{{$x}}}}",
        ANNOT
    ));
    let diag = single_error(&sink);
    assert_eq!(diag.code, Some(TypeError::UndefinedVariable.code()));
}

// ----------------------------------------------------------------------
// Output format and determinism

#[test]
fn test_compact_rendering_has_location_and_context() {
    let source = format!("{}\n{{{{.Bar}}}}", ANNOT);
    let (mut store, mut loader) = fixture();
    let mut sources = SourceManager::new();
    let file = sources.add_file("test.tmpl", source.clone());
    let set = parse("test.tmpl", &source).unwrap();
    let mut trees = NamedTreeMap::new();
    add_trees(&mut trees, file, set).unwrap();

    let sink = Checker::new(
        &mut store,
        &mut loader,
        &sources,
        &trees,
        CheckOptions::default(),
    )
    .check("test.tmpl", None)
    .unwrap();

    let emitter = DiagnosticEmitter::new(&sources);
    let line = emitter.format_compact(single_error(&sink));
    assert_eq!(
        line,
        "test.tmpl:2:3: in {{.Bar}}: can't evaluate field Bar in type example.com/p.Dot1"
    );
}

#[test]
fn test_two_runs_agree() {
    let source = format!(
        "{}{{{{.Bar}}}}{{{{range .Foo}}}}{{{{end}}}}{{{{len .Inner}}}}",
        ANNOT
    );
    let first: Vec<String> = run(&source).iter().map(|d| d.message.clone()).collect();
    let second: Vec<String> = run(&source).iter().map(|d| d.message.clone()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_diagnostics_in_encounter_order() {
    let sink = run(&format!("{}{{{{.Bar}}}}{{{{.Baz}}}}", ANNOT));
    let messages: Vec<&str> = sink.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("Bar"));
    assert!(messages[1].contains("Baz"));
}
