crate::config_group!({

    /// The log destination.  By default, logs go to the console.
    ///
    /// If this path exists as a directory or ends with a /, a log file named
    /// `<prefix>_<timestamp>_<pid>.log` is created in that directory; otherwise the path
    /// is used as the log file itself.  An empty value means the console.
    ///
    /// Use the environment variable `FUSION_LOG_DEST` to set this value.
    ref dest: Option<String> = None;

    /// The format the logs are printed in. If "json", then logs are dumped as json blobs; otherwise they
    /// are treated as text.  By default logging to files is done in json and console logging is done with text.
    ///
    /// Use the environment variable `FUSION_LOG_FORMAT` to set this value.
    ref format: Option<String> = None;

    /// The base name for a log file when logging to a directory.
    ///
    /// Use the environment variable `FUSION_LOG_PREFIX` to set this value.
    ref prefix: String = "fusion".to_owned();

});
