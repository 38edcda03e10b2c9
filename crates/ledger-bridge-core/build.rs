use std::fs;
use std::path::Path;

const BINDINGS: &[(&str, &str)] = &[
    ("proto/common/common.proto", "src/generated/common.rs"),
    ("proto/msp/identities.proto", "src/generated/msp.rs"),
    ("proto/peer/chaincode.proto", "src/generated/protos.rs"),
    ("proto/peer/proposal.proto", "src/generated/protos.rs"),
    ("proto/peer/proposal_response.proto", "src/generated/protos.rs"),
    ("proto/peer/transaction.proto", "src/generated/protos.rs"),
    ("proto/gateway/gateway.proto", "src/generated/gateway.rs"),
    ("proto/google/rpc/status.proto", "src/generated/google.rpc.rs"),
];

fn main() {
    for (proto, generated) in BINDINGS {
        let proto = Path::new(proto);
        let generated = Path::new(generated);

        println!("cargo:rerun-if-changed={}", proto.display());
        println!("cargo:rerun-if-changed={}", generated.display());

        if !generated.exists() {
            panic!(
                "missing generated protobuf source '{}'; commit generated artifacts",
                generated.display()
            );
        }

        if let (Ok(proto_meta), Ok(gen_meta)) = (fs::metadata(proto), fs::metadata(generated)) {
            if let (Ok(proto_mtime), Ok(gen_mtime)) = (proto_meta.modified(), gen_meta.modified())
            {
                if proto_mtime > gen_mtime {
                    println!(
                        "cargo:warning=proto '{}' is newer than generated Rust stubs '{}'",
                        proto.display(),
                        generated.display()
                    );
                }
            }
        }
    }
}
