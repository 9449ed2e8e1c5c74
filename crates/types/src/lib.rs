//! Shared type definitions for the Design Automation sample client.
//!
//! Every JSON body exchanged with the automation and storage services is
//! modelled here as a plain `serde` structure so that payloads are validated
//! at the boundary instead of being assembled ad hoc. The crate also owns the
//! workflow configuration record and the client credential pair.

pub mod auth;
pub mod automation;
pub mod config;
pub mod storage;

pub use auth::{ClientCredentials, TokenResponse};
pub use automation::{
    ActivityParameter, ActivityPayload, AliasPayload, AliasResponse, AppBundlePayload, Page, ParameterVerb, UploadParameters,
    VersionResponse, WorkItemArgument, WorkItemRequest, WorkItemResponse, WorkItemStatus, qualified_name,
};
pub use config::{ConfigError, OutputRetrieval, WorkflowConfig};
pub use storage::{
    BucketList, BucketPolicy, BucketSummary, CreateBucketRequest, ObjectDetails, ObjectList, ObjectSummary, SignedUrlRequest,
    SignedUrlResponse,
};
