//! Wire codecs for the OCSP exchange.

pub mod ocsp;
