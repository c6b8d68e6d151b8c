//! Language level tests driving whole builds through the in-memory driver.

use ehlit::driver::{CompileOutput, Driver};
use ehlit::Severity;

fn compile(source: &str) -> CompileOutput {
    Driver::new("test.eh", source).compile().expect("build succeeds")
}

fn compile_err(source: &str) -> ehlit::BuildError {
    Driver::new("test.eh", source)
        .compile()
        .expect_err("build fails")
}

#[test]
fn emits_a_minimal_program() {
    let out = compile("int main()\n{\n    return 0\n}\n");
    assert!(out.c_source.contains("#include <stdint.h>"));
    assert!(out.c_source.contains("int32_t main(void)"));
    assert!(out.c_source.contains("return (0);"));
    assert!(out.failures.is_empty());
}

#[test]
fn builtin_types_map_to_c() {
    let out = compile("int main(int ac, str[] av)\n{\n    return ac\n}\n");
    assert!(out.c_source.contains("int32_t main(int32_t ac, char** av)"));
}

#[test]
fn undeclared_identifier_is_an_error() {
    let err = compile_err("int main()\n{\n    return foo\n}\n");
    assert!(err
        .failures
        .iter()
        .any(|f| f.msg == "use of undeclared identifier foo"));
    assert_eq!(err.max_severity(), Severity::Error);
}

#[test]
fn not_enough_arguments_warns_with_exact_text() {
    let out = compile(
        "int f(int a, int b)\n{\n    return a + b\n}\nint main()\n{\n    return f(1)\n}\n",
    );
    let warnings: Vec<_> = out
        .failures
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].msg,
        "not enough arguments for call to f: expected 2, got 1"
    );
}

#[test]
fn too_many_arguments_warns_with_exact_text() {
    let out = compile(
        "int f(int a, int b)\n{\n    return a + b\n}\nint main()\n{\n    return f(1, 2, 3)\n}\n",
    );
    let warnings: Vec<_> = out
        .failures
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].msg,
        "too many arguments for call to f: expected 2, got 3"
    );
}

#[test]
fn default_arguments_fill_missing_positions() {
    let out = compile(
        "void f(int a, int b = 0)\n{\n}\nint main()\n{\n    f(3)\n    return 0\n}\n",
    );
    assert!(out.failures.is_empty(), "defaults satisfy the arity check");
    assert!(out.c_source.contains("_EF1fB3intB3int(3, 0)"));
}

#[test]
fn incomplete_struct_member_access_fails() {
    let err = compile_err(
        "struct Point\nint use_point(ref Point p)\n{\n    return p.x\n}\n",
    );
    assert!(err
        .failures
        .iter()
        .any(|f| f.msg == "accessing incomplete struct Point"));
}

#[test]
fn calling_a_non_function_is_an_error() {
    let err = compile_err("int v = 3\nint main()\n{\n    return v(1)\n}\n");
    assert!(err
        .failures
        .iter()
        .any(|f| f.msg.starts_with("calling non function type")));
}

#[test]
fn forward_reference_emits_a_prototype() {
    let out = compile(
        "int main()\n{\n    declared_later()\n    return 0\n}\nvoid declared_later()\n{\n}\n",
    );
    let proto = out
        .c_source
        .find("_EF14declared_later(void);")
        .expect("prototype present");
    let body = out
        .c_source
        .find("int32_t main(void)")
        .expect("main present");
    assert!(proto < body, "prototype precedes the referencing function");
}

#[test]
fn struct_definition_and_field_access() {
    let out = compile(
        "struct S\n{\n    int x\n}\nint main()\n{\n    S s\n    s.x = 3\n    return s.x\n}\n",
    );
    assert!(out.c_source.contains("struct _ES1S"));
    assert!(out.c_source.contains("int32_t x;"));
    assert!(out.c_source.contains("s.x = 3;"));
}

#[test]
fn reference_field_access_uses_arrow() {
    let out = compile(
        "struct S\n{\n    int x\n}\nint main()\n{\n    S s\n    ref S rs = ref s\n    rs.x = 1\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("struct _ES1S* rs = &s;"));
    assert!(out.c_source.contains("rs->x = 1;"));
}

#[test]
fn any_round_trip_keeps_pointer_depth() {
    let out = compile(
        "struct S\n{\n    int x\n}\nany id_any(any p)\n{\n    return p\n}\nint main()\n{\n    S s\n    ref S rs = id_any(ref s)\n    return 0\n}\n",
    );
    // The concrete-to-any direction folds the address-of into the call
    // argument; the any-to-concrete direction restores exactly one pointer
    // level through the view cast. No indirection is gained or lost.
    assert!(out.c_source.contains("_EF6id_anyB3any(&s)"));
    assert!(out
        .c_source
        .contains("struct _ES1S* rs = (struct _ES1S*)_EF6id_anyB3any(&s);"));
}

#[test]
fn string_and_char_any_conversions_use_no_extra_reference() {
    let out = compile(
        "any id_any(any p)\n{\n    return p\n}\nint main()\n{\n    str s = id_any(\"hi\")\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("char* s = (char*)_EF6id_anyB3any(\"hi\");"));
}

#[test]
fn method_binding_rewrites_the_call() {
    let out = compile(
        "class C\n{\n    int v\n    int get(int add)\n    {\n        return v + add\n    }\n}\nint main()\n{\n    C c\n    return c.get(1)\n}\n",
    );
    // The class lowers to a struct plus a free function taking this; the
    // call site passes a reference to the object as first argument and the
    // mangled name excludes the injected this parameter.
    assert!(out.c_source.contains("struct _EC1C"));
    assert!(out.c_source.contains("int32_t v;"));
    assert!(out.c_source.contains("_EC1CF3getB3int(struct _EC1C* _this, int32_t add)"));
    assert!(out.c_source.contains("_this->v"));
    assert!(out.c_source.contains("_EC1CF3getB3int(&c, 1)"));
}

#[test]
fn enum_fields_are_typed_as_the_enum() {
    let out = compile(
        "enum Color\n{\n    RED,\n    GREEN\n}\nint main()\n{\n    Color c = Color.RED\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("enum _EE5Color"));
    assert!(out.c_source.contains("_EE5ColorV3RED"));
}

#[test]
fn incomplete_enum_access_fails() {
    let err = compile_err("enum Color\nint main()\n{\n    return Color.RED\n}\n");
    assert!(err
        .failures
        .iter()
        .any(|f| f.msg == "accessing incomplete enum Color"));
}

#[test]
fn namespace_members_mangle_with_their_path() {
    let out = compile(
        "namespace gfx\n{\n    int width = 640\n}\nint main()\n{\n    return gfx.width\n}\n",
    );
    assert!(out.c_source.contains("_EN3gfxV5width"));
}

#[test]
fn alias_emits_a_typedef() {
    let out = compile("alias int nb\nnb main()\n{\n    nb i = 42\n    return i\n}\n");
    assert!(out.c_source.contains("typedef int32_t _EL2nb;"));
    assert!(out.c_source.contains("_EL2nb i = 42;"));
}

#[test]
fn switch_lowers_with_implicit_break() {
    let out = compile(
        "int main(int ac, str[] av)\n{\n    switch ac\n    {\n        case 1\n        {\n            return 1\n        }\n        default return 0\n    }\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("switch (ac)"));
    assert!(out.c_source.contains("case 1:"));
    assert!(out.c_source.contains("default:"));
    assert!(out.c_source.contains("break;"));
}

#[test]
fn fallthrough_suppresses_break() {
    let out = compile(
        "int main(int ac, str[] av)\n{\n    switch ac\n    {\n        case 1\n        {\n            ac = 2\n            fallthrough\n        }\n        default return 0\n    }\n    return 0\n}\n",
    );
    let case_pos = out.c_source.find("case 1:").expect("case present");
    let default_pos = out.c_source.find("default:").expect("default present");
    let between = &out.c_source[case_pos..default_pos];
    assert!(!between.contains("break;"));
}

#[test]
fn while_and_do_while_loops_emit() {
    let out = compile(
        "int main()\n{\n    int i = 0\n    while i < 10\n    {\n        i += 1\n    }\n    do\n    {\n        i += 1\n    }\n    while i < 20\n    return i\n}\n",
    );
    assert!(out.c_source.contains("while (i < 10)"));
    assert!(out.c_source.contains("do\n"));
    assert!(out.c_source.contains("while (i < 20);"));
}

#[test]
fn for_loop_requires_an_initialized_variable() {
    let err = compile_err(
        "int main()\n{\n    for int i; i < 3; i += 1\n    {\n    }\n    return 0\n}\n",
    );
    assert!(err
        .failures
        .iter()
        .any(|f| f.msg == "uninitialized loop variable i"));
}

#[test]
fn for_loop_emits_c_for() {
    let out = compile(
        "int main()\n{\n    int total = 0\n    for int i = 0; i < 3; i += 1\n    {\n        total += 1\n    }\n    return total\n}\n",
    );
    assert!(out.c_source.contains("for (int32_t i = 0; i < 3; i += 1)"));
}

#[test]
fn native_variadic_calls_pack_into_an_array() {
    let out = compile(
        "int sum(int n, ...)\n{\n    return n\n}\nint main()\n{\n    return sum(1, 2, 3)\n}\n",
    );
    // Trailing arguments materialize into a hoisted length-prefixed array.
    assert!(out.c_source.contains("void* __vargs0[2] = { 2, 3 };"));
    assert!(out.c_source.contains("_EF3sumB3int(1, 2, __vargs0)"));
    assert!(out.c_source.contains("int32_t vargs_len, void* vargs"));
}

#[test]
fn equality_sequences_expand_to_pairs() {
    let out = compile(
        "int main(int ac, str[] av)\n{\n    if ac == 1 == 1\n    {\n        return 1\n    }\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("ac == 1 && ac == 1"));
}

#[test]
fn function_pointer_variables_use_declarator_syntax() {
    let out = compile(
        "int f(int a)\n{\n    return a\n}\nint main()\n{\n    func<int(int)> pf = f\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("int32_t(* pf)(int32_t) = &_EF1fB3int;"));
}

#[test]
fn cast_syntax_rewrites_type_calls() {
    let out = compile("int main()\n{\n    int i = int(0)\n    return i\n}\n");
    assert!(out.c_source.contains("int32_t i = ((int32_t)0);"));
}

#[test]
fn build_is_deterministic() {
    let src = "struct S\n{\n    int x\n}\nint f(int a, int b)\n{\n    return a + b\n}\nint main()\n{\n    return f(1, 2)\n}\n";
    let a = compile(src);
    let b = compile(src);
    assert_eq!(a.c_source, b.c_source);
    assert_eq!(a.import_source, b.import_source);
    assert_eq!(a.failures, b.failures);
}

#[test]
fn import_file_lists_public_surface_only() {
    let out = compile(
        "priv int secret = 1\nint visible = 2\nint main()\n{\n    return 0\n}\n",
    );
    assert!(!out.import_source.contains("secret"));
    assert!(out.import_source.contains("int visible"));
    assert!(out.import_source.contains("int main()"));
}

#[test]
fn dump_writer_outlines_the_tree() {
    let out = compile("int main()\n{\n    return 0\n}\n");
    assert!(out.dump.contains("--- AST ---"));
    assert!(out.dump.contains("FunctionDefinition main"));
    assert!(out.dump.contains("Return"));
}

#[test]
fn static_and_inline_qualifiers_reach_c() {
    let out = compile(
        "priv void helper()\n{\n}\ninline int twice(int x)\n{\n    return x + x\n}\nint main()\n{\n    return 0\n}\n",
    );
    assert!(out.c_source.contains("static void _EF6helper(void)"));
    assert!(out.c_source.contains("inline int32_t _EF5twiceB3int(int32_t x)"));
}
