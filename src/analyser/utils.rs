//! Contains the tshark-backed packet source and helpers that turn rtshark packets into [PacketRecord]s.
use rtshark::{Layer, Packet, RTShark};
use std::{env, ffi::OsString, fs, iter, path::{Path, PathBuf}};
use tempfile::TempDir;
use crate::error::{Error, Result};
use super::containers::{LayerRecord, NetworkLayer, PacketRecord};

/// Pseudo-layers tshark emits for every packet. They describe the capture, not the traffic.
const SKIPPED_LAYERS: [&str; 2] = ["geninfo", "frame"];

/// Layers we report as a packet's transport protocol, in lookup order.
const TRANSPORT_LAYERS: [&str; 4] = ["tcp", "udp", "sctp", "dccp"];

const TSHARK: &str = "tshark";

/// Anything that can hand out decoded packets one at a time.
///
/// `Ok(None)` means the capture is exhausted. Callers may stop pulling early.
pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>>;
}

/// A running tshark process reading a capture file.
///
/// The process is killed when the source is dropped, whether the capture was read to the end or not.
pub struct TsharkSource {
    rtshark: RTShark,
    // Held so the shim outlives tshark.
    _shim: Option<LuaShim>,
}

impl TsharkSource {
    /// Loads PCAP/PCAPNG file via rtshark.
    ///
    /// rtshark only passes `-o` options through, so a Lua dissection script is loaded by putting a
    /// `tshark` shim that adds `-X lua_script:<script>` first on the child's PATH.
    pub fn open(capture_file: &Path, lua_script: Option<&Path>) -> Result<Self> {
        log::info!("Loading capture file.");

        if !capture_file.is_file() {
            return Err(Error::Decode(format!("capture file {} not found", capture_file.display())));
        }

        let shim = match lua_script {
            Some(script) => Some(LuaShim::create(script, env::var_os("PATH"))?),
            None => None,
        };

        let input_path = capture_file.to_string_lossy().into_owned();
        let mut builder = rtshark::RTSharkBuilder::builder()
            .input_path(&input_path);
        if let Some(shim) = &shim {
            log::debug!("tshark shim in {}", shim.dir().display());
            builder = builder.env_path(shim.search_path());
        }

        let rtshark = match builder.spawn() {
            Err(err) => {
                log::error!("Error spawning tshark: {err}");
                return Err(Error::Decode(format!("could not start tshark: {err}")));
            }
            Ok(rtshark) => {
                log::info!("Reading from {}", input_path);
                rtshark
            }
        };

        Ok(Self {
            rtshark,
            _shim: shim,
        })
    }
}

impl PacketSource for TsharkSource {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>> {
        match self.rtshark.read() {
            Ok(Some(packet)) => Ok(Some(to_record(packet))),
            Ok(None) => Ok(None),
            Err(e) => Err(Error::Decode(format!("error parsing tshark output: {e}"))),
        }
    }
}

impl Drop for TsharkSource {
    fn drop(&mut self) {
        log::debug!("Stopping tshark.");
        self.rtshark.kill();
    }
}

/// A private directory holding a `tshark` shell script that runs the real tshark with a dissection script.
///
/// Only the tshark child sees it, through its PATH. Removed on drop.
pub struct LuaShim {
    dir: TempDir,
    search_path: String,
}

impl LuaShim {
    /// `path_var` is the PATH the real tshark is looked up in; the shim dir is prepended to it.
    pub fn create(script: &Path, path_var: Option<OsString>) -> Result<Self> {
        if !script.is_file() {
            return Err(Error::Decode(format!("dissection script {} not found", script.display())));
        }
        let script = fs::canonicalize(script)
            .map_err(|e| Error::Decode(format!("could not resolve dissection script {}: {e}", script.display())))?;

        let dirs: Vec<PathBuf> = path_var.as_deref().map(|var| env::split_paths(var).collect()).unwrap_or_default();
        let tshark = dirs
            .iter()
            .map(|dir| dir.join(TSHARK))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::Decode("unable to find tshark in PATH".to_string()))?;

        let dir = tempfile::Builder::new()
            .prefix("pcap-insight-lua")
            .tempdir()
            .map_err(|e| Error::Decode(format!("could not create shim directory: {e}")))?;

        let shim_path = dir.path().join(TSHARK);
        let contents = format!(
            "#!/bin/sh\nexec {} -X {} \"$@\"\n",
            shell_quote(&utf8(&tshark)?),
            shell_quote(&format!("lua_script:{}", utf8(&script)?)),
        );
        fs::write(&shim_path, contents)
            .map_err(|e| Error::Decode(format!("could not write tshark shim: {e}")))?;
        make_executable(&shim_path)?;

        let search_path = env::join_paths(iter::once(dir.path().to_path_buf()).chain(dirs))
            .map_err(|e| Error::Decode(format!("could not build PATH for tshark: {e}")))?
            .into_string()
            .map_err(|_| Error::Decode("PATH is not valid UTF-8".to_string()))?;

        log::info!("Loading dissection script {} through {}", script.display(), shim_path.display());
        Ok(Self { dir, search_path })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn search_path(&self) -> &str {
        &self.search_path
    }
}

fn utf8(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| Error::Decode(format!("{} is not valid UTF-8", path.display())))
}

/// Single-quotes `value` for /bin/sh.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::Decode(format!("could not make tshark shim executable: {e}")))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Err(Error::Decode("dissection scripts need a Unix shell".to_string()))
}

/// Transform an rtshark [Packet] into a [PacketRecord].
pub fn to_record(packet: Packet) -> PacketRecord {
    from_layers(packet.into_iter().collect())
}

/// Builds a [PacketRecord] from the layers tshark dissected.
///
/// The network layer is looked up once here; downstream code only checks the Option.
fn from_layers(layers: Vec<Layer>) -> PacketRecord {
    let network = network_layer(&layers);
    let mut records = Vec::new();

    for layer in layers {
        if SKIPPED_LAYERS.contains(&layer.name()) {
            continue;
        }
        let mut record = LayerRecord::new(layer.name());
        for metadata in layer {
            record.fields.push(metadata.display().to_string());
        }
        records.push(record);
    }

    PacketRecord { network, layers: records }
}

/// Peels the addresses and the transport tag off the first `ip` layer.
///
/// Earlier versions only counted IPv4. An `ipv6` layer is now taken too, but only when the packet
/// has no `ip` layer, so IPv4 packets (and IPv6 tunnelled inside IPv4) are counted as before.
fn network_layer(layers: &[Layer]) -> Option<NetworkLayer> {
    let layer_named = |name: &str| layers.iter().find(|layer| layer.name() == name);
    let (layer, prefix) = match layer_named("ip") {
        Some(ip) => (ip, "ip"),
        None => (layer_named("ipv6")?, "ipv6"),
    };

    let src = layer.metadata(&format!("{prefix}.src"));
    let dst = layer.metadata(&format!("{prefix}.dst"));
    let (src, dst) = match (src, dst) {
        (Some(src), Some(dst)) => (src.value().to_string(), dst.value().to_string()),
        _ => {
            log::warn!("{prefix} layer without source/destination address, treating packet as non-IP");
            return None;
        }
    };

    let transport = TRANSPORT_LAYERS
        .iter()
        .find(|name| layer_named(**name).is_some())
        .map(|name| name.to_uppercase());

    Some(NetworkLayer { src, dst, transport })
}
