// @generated
// Generated from: proto/msp/identities.proto
// Manual check-in for offline builds.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SerializedIdentity {
    #[prost(string, tag = "1")]
    pub mspid: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub id_bytes: ::prost::alloc::vec::Vec<u8>,
}
