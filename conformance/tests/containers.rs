//! Container nesting and implicit instantiation scenarios.

use loom_conformance::{assert_build_success, assert_ir, demos};
use loom_plugins::{process, rpc, service};
use loom_wiring::WiringSpec;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn processes_nest_inside_containers_with_threaded_edges() {
    init_logging();
    let demo = demos::containers();
    let app = assert_build_success(&demo.spec, &demo.root_refs());
    assert_ir(
        &app,
        "containers = Application() {
            leaf.addr
            leaf.bind_addr = AddressConfig()
            leaf.dial_addr = AddressConfig()
            leaf.handler.visibility
            leaf_ctr = Container(leaf.bind_addr) {
              leaf_proc = Process(leaf.bind_addr) {
                leaf = Leaf()
                leaf.rpc_server = RpcServer(leaf, leaf.bind_addr)
              }
            }
            nonleaf.addr
            nonleaf.bind_addr = AddressConfig()
            nonleaf.handler.visibility
            nonleaf_ctr = Container(leaf.dial_addr, nonleaf.bind_addr) {
              nonleaf_proc = Process(leaf.dial_addr, nonleaf.bind_addr) {
                leaf.rpc_client = RpcClient(leaf.dial_addr)
                nonleaf = NonLeaf(leaf.rpc_client)
                nonleaf.rpc_server = RpcServer(nonleaf, nonleaf.bind_addr)
              }
            }
          }",
    );
}

#[test]
fn basic_services_build_at_the_application_level() {
    init_logging();
    let spec = WiringSpec::new("basic");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    let app = assert_build_success(&spec, &["leaf", "nonleaf"]);
    assert_ir(
        &app,
        "basic = Application() {
            leaf = Leaf()
            leaf.handler.visibility
            nonleaf = NonLeaf(leaf)
            nonleaf.handler.visibility
          }",
    );
}

#[test]
fn implicit_dependencies_are_instantiated() {
    init_logging();
    let spec = WiringSpec::new("implicit");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    // Only nonleaf is requested; leaf comes along as a dependency.
    let app = assert_build_success(&spec, &["nonleaf"]);
    assert_ir(
        &app,
        "implicit = Application() {
            leaf = Leaf()
            leaf.handler.visibility
            nonleaf = NonLeaf(leaf)
            nonleaf.handler.visibility
          }",
    );
}

#[test]
fn lazy_destination_instantiation_reaches_the_right_process() {
    init_logging();
    let spec = WiringSpec::new("implicit_rpc");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    rpc::deploy(&spec, &leaf);
    process::deploy(&spec, &leaf);
    // Only nonleaf is requested.  Its client side builds at the application
    // level; leaf's server side is instantiated lazily, inside leaf_proc.
    let app = assert_build_success(&spec, &["nonleaf"]);
    assert_ir(
        &app,
        "implicit_rpc = Application() {
            leaf.addr
            leaf.bind_addr = AddressConfig()
            leaf.dial_addr = AddressConfig()
            leaf.handler.visibility
            leaf.rpc_client = RpcClient(leaf.dial_addr)
            leaf_proc = Process(leaf.bind_addr) {
              leaf = Leaf()
              leaf.rpc_server = RpcServer(leaf, leaf.bind_addr)
            }
            nonleaf = NonLeaf(leaf.rpc_client)
            nonleaf.handler.visibility
          }",
    );
}

#[test]
fn client_process_contains_clients_of_its_children() {
    init_logging();
    let spec = WiringSpec::new("client_proc");
    let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
    let nonleaf = service::define_service(&spec, "nonleaf", "NonLeaf", &[&leaf]);
    let driver = process::create_client_process(&spec, "driver", &[&nonleaf]);
    let app = assert_build_success(&spec, &[&driver]);
    assert_ir(
        &app,
        "client_proc = Application() {
            driver = Process() {
              leaf = Leaf()
              nonleaf = NonLeaf(leaf)
            }
            leaf.handler.visibility
            nonleaf.handler.visibility
          }",
    );
}

#[test]
fn test_bundle_surfaces_dial_dependencies_as_edges() {
    init_logging();
    let demo = demos::bundle();
    let app = assert_build_success(&demo.spec, &demo.root_refs());
    assert_ir(
        &app,
        "bundle = Application() {
            leaf.addr
            leaf.bind_addr = AddressConfig()
            leaf.dial_addr = AddressConfig()
            leaf.handler.visibility
            leaf_proc = Process(leaf.bind_addr) {
              leaf = Leaf()
              leaf.rpc_server = RpcServer(leaf, leaf.bind_addr)
            }
            tests = TestBundle(leaf.dial_addr) {
              leaf.rpc_client = RpcClient(leaf.dial_addr)
            }
          }",
    );
}

#[test]
fn mixed_explicit_and_deploy_instantiation_agree() {
    init_logging();
    // Explicit process creation and the deploy shorthand should produce the
    // same topology for a single service.
    let explicit = {
        let spec = WiringSpec::new("same");
        let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
        rpc::deploy(&spec, &leaf);
        let proc_name = process::create_process(&spec, "leaf_proc", &[&leaf]);
        assert_build_success(&spec, &[&proc_name]).render()
    };
    let shorthand = {
        let spec = WiringSpec::new("same");
        let leaf = service::define_service(&spec, "leaf", "Leaf", &[]);
        rpc::deploy(&spec, &leaf);
        let proc_name = process::deploy(&spec, &leaf);
        assert_build_success(&spec, &[&proc_name]).render()
    };
    assert_eq!(explicit, shorthand);
}
