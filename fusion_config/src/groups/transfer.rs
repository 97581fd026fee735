use utils::ByteSize;

crate::config_group!({

    /// The size of each part of a multipart upload.  Only the final part may be shorter.
    ///
    /// The default value is 8mb.
    ///
    /// Use the environment variable `FUSION_TRANSFER_UPLOAD_PART_SIZE` to set this value.
    ref upload_part_size: ByteSize = ByteSize::from("8mb");

    /// Payloads of at most this many bytes are uploaded with a single PUT; anything larger
    /// goes through a multipart upload session.
    ///
    /// The default value is 50mb.
    ///
    /// Use the environment variable `FUSION_TRANSFER_SINGLE_PART_UPLOAD_SIZE_LIMIT` to set this value.
    ref single_part_upload_size_limit: ByteSize = ByteSize::from("50mb");

    /// Number of parts uploaded concurrently.  When unset, the host's available parallelism is used.
    ///
    /// Use the environment variable `FUSION_TRANSFER_UPLOAD_THREAD_POOL_SIZE` to set this value.
    ref upload_thread_pool_size: Option<usize> = None;

    /// Number of parts fetched concurrently on a multipart download.  When unset, the host's
    /// available parallelism is used.
    ///
    /// Use the environment variable `FUSION_TRANSFER_DOWNLOAD_THREAD_POOL_SIZE` to set this value.
    ref download_thread_pool_size: Option<usize> = None;

    /// The digest algorithm used for the Digest header; one of SHA-256, SHA-384 or SHA-512.
    ///
    /// The default value is SHA-256.
    ///
    /// Use the environment variable `FUSION_TRANSFER_DIGEST_ALGORITHM` to set this value.
    ref digest_algorithm: String = "SHA-256".to_owned();

    /// Verify the checksum advertised by the server for single-part downloads written to a file.
    /// Only a plain base64 SHA-256 value is checked; a composite value (`<b64>-<parts>`) is
    /// skipped.  A server that reports a one-part multipart upload's digest-of-digests as a plain
    /// value fails verification, so disable this for such servers.
    ///
    /// The default value is true.
    ///
    /// Use the environment variable `FUSION_TRANSFER_VERIFY_DOWNLOAD_CHECKSUM` to set this value.
    ref verify_download_checksum: bool = true;

    /// Number of downloaded parts buffered ahead of a slow stream consumer.
    ///
    /// The default value is 4.
    ///
    /// Use the environment variable `FUSION_TRANSFER_STREAM_CHANNEL_CAPACITY` to set this value.
    ref stream_channel_capacity: usize = 4;

});
