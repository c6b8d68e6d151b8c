//! Import resolution tests against real files on disk.

use ehlit::driver::Driver;
use ehlit::Severity;
use std::fs;
use tempfile::tempdir;

#[test]
fn imports_a_sibling_module() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("lib.eh"), "int shared = 3\n").expect("write");

    let out = Driver::new("main.eh", "import lib\nint main()\n{\n    return shared\n}\n")
        .with_import_path(dir.path())
        .compile()
        .expect("build succeeds");
    assert!(out.c_source.contains("int32_t _EV6shared = 3;"));
    assert!(out.c_source.contains("return (_EV6shared);"));
}

#[test]
fn missing_import_reports_position_and_path() {
    let err = Driver::new("main.eh", "import nothing_here\nint main()\n{\n    return 0\n}\n")
        .compile()
        .expect_err("build fails");
    let failure = err
        .failures
        .iter()
        .find(|f| f.msg == "nothing_here: no such file or directory")
        .expect("missing-import failure");
    assert_eq!(failure.severity, Severity::Error);
    assert_eq!(failure.pos, 0);
}

#[test]
fn private_symbols_do_not_cross_imports() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("secrets.eh"), "priv int secret = 42\n").expect("write");

    let err = Driver::new("main.eh", "import secrets\nint main()\n{\n    return secret\n}\n")
        .with_import_path(dir.path())
        .compile()
        .expect_err("build fails");
    assert!(
        err.failures
            .iter()
            .any(|f| f.msg == "accessing to private symbol `secret`"),
        "the failure names the private symbol, not an undeclared identifier"
    );
    assert!(!err
        .failures
        .iter()
        .any(|f| f.msg.contains("undeclared identifier")));
}

#[test]
fn each_file_is_parsed_at_most_once() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("a.eh"), "int aval = 3\n").expect("write");
    fs::write(dir.path().join("b.eh"), "import a\nint bval = 4\n").expect("write");

    // `a` is reachable directly and through `b`; its declarations must not
    // duplicate in the emitted C.
    let out = Driver::new(
        "main.eh",
        "import a\nimport b\nint main()\n{\n    return aval + bval\n}\n",
    )
    .with_import_path(dir.path())
    .compile()
    .expect("build succeeds");
    assert_eq!(out.c_source.matches("int32_t _EV4aval = 3;").count(), 1);
}

#[test]
fn directory_imports_recurse_with_the_same_guarantee() {
    let dir = tempdir().expect("tempdir");
    let pkg = dir.path().join("pkg");
    fs::create_dir(&pkg).expect("mkdir");
    fs::write(pkg.join("one.eh"), "int one = 1\n").expect("write");
    fs::write(pkg.join("two.eh"), "int two = 2\n").expect("write");

    let out = Driver::new(
        "main.eh",
        "import pkg\nimport pkg\nint main()\n{\n    return one + two\n}\n",
    )
    .with_import_path(dir.path())
    .compile()
    .expect("build succeeds");
    assert_eq!(out.c_source.matches("int32_t _EV3one = 1;").count(), 1);
    assert_eq!(out.c_source.matches("int32_t _EV3two = 2;").count(), 1);
}

#[test]
fn independent_builds_do_not_share_dedup_state() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("lib.eh"), "int shared = 3\n").expect("write");
    let source = "import lib\nint main()\n{\n    return shared\n}\n";

    let first = Driver::new("main.eh", source)
        .with_import_path(dir.path())
        .compile()
        .expect("first build succeeds");
    let second = Driver::new("main.eh", source)
        .with_import_path(dir.path())
        .compile()
        .expect("second build sees a fresh session");
    assert_eq!(first.c_source, second.c_source);
}

#[test]
fn imported_function_definitions_become_prototypes() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("funcs.eh"),
        "int helper(int x)\n{\n    return x\n}\n",
    )
    .expect("write");

    let out = Driver::new(
        "main.eh",
        "import funcs\nint main()\n{\n    return helper(1)\n}\n",
    )
    .with_import_path(dir.path())
    .compile()
    .expect("build succeeds");
    assert!(out.c_source.contains("int32_t _EF6helperB3int(int32_t x);"));
    assert!(
        !out.c_source.contains("_EF6helperB3int(int32_t x)\n{"),
        "imported bodies are not re-emitted"
    );
}

#[test]
fn includes_without_a_c_frontend_fail_cleanly() {
    let err = Driver::new("main.eh", "include stdio.h\nint main()\n{\n    return 0\n}\n")
        .compile()
        .expect_err("build fails");
    assert!(err
        .failures
        .iter()
        .any(|f| f.msg.contains("unable to import C header stdio.h")));
}
