pub(crate) mod firestore;
pub(crate) mod s3;

pub use firestore::FirestoreClient;
pub use s3::S3BlobStore;
