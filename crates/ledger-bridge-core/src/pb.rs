//! Checked-in protocol buffer bindings for the subset of the ledger gateway
//! protocol used by the submission pipeline.

#![allow(clippy::all)]

pub mod common {
    include!("generated/common.rs");
}

pub mod msp {
    include!("generated/msp.rs");
}

pub mod protos {
    include!("generated/protos.rs");
}

pub mod gateway {
    include!("generated/gateway.rs");
}

pub mod google {
    pub mod rpc {
        include!("generated/google.rpc.rs");
    }
}
