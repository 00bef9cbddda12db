//! End-to-end IR layout scenarios.
//!
//! Each test builds one demo wiring spec and asserts either the exact
//! rendered IR or the error semantics.  Rendered-IR comparison is brittle by
//! nature, but it is by far the most direct way to pin down namespace
//! contents, argument edges, and modifier ordering all at once.

use loom_conformance::{assert_build_failure, assert_build_success, assert_ir, demos};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn services_within_same_process() {
    init_logging();
    let demo = demos::colocated();
    let app = assert_build_success(&demo.spec, &demo.root_refs());
    assert_ir(
        &app,
        "colocated = Application() {
            leaf.handler.visibility
            myproc = Process() {
              leaf = Leaf()
              nonleaf = NonLeaf(leaf)
            }
            nonleaf.handler.visibility
          }",
    );
}

#[test]
fn separate_processes_without_rpc_fail_with_reachability_error() {
    init_logging();
    let demo = demos::split_without_rpc();
    let err = assert_build_failure(&demo.spec, &demo.root_refs());
    let message = err.to_string();
    assert!(message.contains("reachability error"), "got: {message}");
    assert!(message.contains("leaf_proc"), "got: {message}");
    assert!(message.contains("nonleaf_proc"), "got: {message}");

    // The partial IR is still available for debugging.
    let partial = err.app.render();
    assert!(partial.contains("leaf_proc = Process()"), "got: {partial}");
}

#[test]
fn rpc_deployment_threads_the_address_across_processes() {
    init_logging();
    let demo = demos::split_with_rpc();
    let app = assert_build_success(&demo.spec, &demo.root_refs());
    assert_ir(
        &app,
        "split_with_rpc = Application() {
            leaf.addr
            leaf.bind_addr = AddressConfig()
            leaf.dial_addr = AddressConfig()
            leaf.handler.visibility
            leaf_proc = Process(leaf.bind_addr) {
              leaf = Leaf()
              leaf.rpc_server = RpcServer(leaf, leaf.bind_addr)
            }
            nonleaf.handler.visibility
            nonleaf_proc = Process(leaf.dial_addr) {
              leaf.rpc_client = RpcClient(leaf.dial_addr)
              nonleaf = NonLeaf(leaf.rpc_client)
            }
          }",
    );
}

#[test]
fn client_pool_wraps_the_rpc_client_inside_the_process() {
    init_logging();
    let demo = demos::pooled_clients();
    let app = assert_build_success(&demo.spec, &demo.root_refs());
    assert_ir(
        &app,
        "pooled_clients = Application() {
            leaf.addr
            leaf.bind_addr = AddressConfig()
            leaf.dial_addr = AddressConfig()
            leaf.handler.visibility
            leaf_proc = Process(leaf.bind_addr) {
              leaf = Leaf()
              leaf.rpc_server = RpcServer(leaf, leaf.bind_addr)
            }
            nonleaf.handler.visibility
            nonleaf_proc = Process(leaf.dial_addr) {
              leaf.pool = ClientPool(leaf.rpc_client, 7) {
                leaf.rpc_client = RpcClient(leaf.dial_addr)
              }
              nonleaf = NonLeaf(leaf.pool)
            }
          }",
    );
}

#[test]
fn shared_cache_across_processes_names_both_namespaces() {
    init_logging();
    let demo = demos::shared_cache();
    let err = assert_build_failure(&demo.spec, &demo.root_refs());
    let message = err.to_string();
    assert!(message.contains("reachability error"), "got: {message}");
    assert!(message.contains("leaf_proc"), "got: {message}");
    assert!(message.contains("nonleaf_proc"), "got: {message}");
    assert!(
        message.contains("exposing shared_cache.backend over RPC"),
        "got: {message}"
    );
}

#[test]
fn rpc_deployed_before_pool_fails_at_the_pool_wiring_line() {
    init_logging();
    let demo = demos::rpc_before_pool();
    let err = assert_build_failure(&demo.spec, &demo.root_refs());
    let message = err.to_string();
    assert!(message.contains("client pool leaf.pool"), "got: {message}");
    // Attribution points at the wiring file that applied the pool.
    assert!(message.contains("demos.rs"), "got: {message}");
}

#[test]
fn double_build_renders_identically() {
    init_logging();
    let demo = demos::split_with_rpc();
    let first = assert_build_success(&demo.spec, &demo.root_refs()).render();
    let second = assert_build_success(&demo.spec, &demo.root_refs()).render();
    assert_eq!(first, second);
}

#[test]
fn every_successful_demo_is_stable_across_rebuilds() {
    init_logging();
    for (a, b) in demos::all().iter().zip(demos::all().iter()) {
        if a.spec.build_ir(&a.root_refs()).is_err() {
            continue;
        }
        let first = assert_build_success(&a.spec, &a.root_refs());
        let second = assert_build_success(&b.spec, &b.root_refs());
        assert_eq!(first.render(), second.render(), "demo {}", a.name);
    }
}
