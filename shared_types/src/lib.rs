//! Types shared with the shells are generated by the build script into `generated/`.
