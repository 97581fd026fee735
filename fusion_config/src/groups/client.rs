use std::time::Duration;

crate::config_group!({

    /// Maximum time allowed to establish a TCP connection to the server.
    ///
    /// The default value is 60 seconds.
    ///
    /// Use the environment variable `FUSION_CLIENT_CONNECT_TIMEOUT` to set this value.
    ref connect_timeout: Duration = Duration::from_secs(60);

    /// Maximum time allowed between receiving data packets during a transfer.
    /// If no data is received for this duration, the request fails.
    ///
    /// The default value is 120 seconds.
    ///
    /// Use the environment variable `FUSION_CLIENT_READ_TIMEOUT` to set this value.
    ref read_timeout: Duration = Duration::from_secs(120);

    /// Cleanup idle connections that are unused for this amount of time.
    ///
    /// The default value is 60sec.
    ///
    /// Use the environment variable `FUSION_CLIENT_IDLE_CONNECTION_TIMEOUT` to set this value.
    ref idle_connection_timeout: Duration = Duration::from_secs(60);

    /// Keep no more than this number of idle connections per host in the connection pool.
    ///
    /// The default value is 16.
    ///
    /// Use the environment variable `FUSION_CLIENT_MAX_IDLE_CONNECTIONS` to set this value.
    ref max_idle_connections: usize = 16;

    /// The User-Agent header sent with every request.
    ///
    /// Use the environment variable `FUSION_CLIENT_USER_AGENT` to set this value.
    ref user_agent: String = concat!("fusion-rs/", env!("CARGO_PKG_VERSION")).to_owned();

});
