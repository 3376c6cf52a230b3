//! Discovery of the monitored host's CPUs and disks from nmon's header lines.
//!
//! Before the first snapshot, nmon writes one header line per CPU core
//! (`CPU001,CPU 1 host,User%,...`) followed by the aggregate `CPU_ALL` header,
//! one `MEM` header, and one header per disk table listing every device
//! (`DISKBUSY,Disk %Busy host,sda,sdb`). The scanner turns these into
//! decoders sized for this host.

use crate::core::{Category, DecoderTable};
use crate::decoders::cpu::AGGREGATE_CPU_ID;
use crate::decoders::{split_first, Decoder, DiskMode, RunContext};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Registers decoders for each category the first time its header is seen.
#[derive(Debug)]
pub struct HeaderScanner {
    context: RunContext,
    registered: HashSet<Category>,
}

impl HeaderScanner {
    pub fn new(context: RunContext) -> Self {
        Self {
            context,
            registered: HashSet::new(),
        }
    }

    /// True once CPU, MEM and DISK discovery have all completed.
    pub fn registered_all(&self) -> bool {
        Category::ALL.iter().all(|c| self.registered.contains(c))
    }

    pub fn is_registered(&self, category: Category) -> bool {
        self.registered.contains(&category)
    }

    /// Observes one line, registering decoders into `table` if it is a header
    /// of a category that has not completed discovery.
    ///
    /// Returns `true` once discovery is complete. Further calls are no-ops.
    pub fn observe<T: DecoderTable + ?Sized>(&mut self, line: &str, table: &mut T) -> bool {
        if self.registered_all() {
            return true;
        }
        let (prefix, rest) = split_first(line);

        if prefix.starts_with(Category::Cpu.prefix()) && !self.is_registered(Category::Cpu) {
            table.register(prefix, Decoder::cpu(&self.context, prefix));
            if prefix == AGGREGATE_CPU_ID {
                self.complete(Category::Cpu);
            }
        } else if prefix.starts_with(Category::Mem.prefix()) && !self.is_registered(Category::Mem) {
            table.register("MEM", Decoder::memory(&self.context));
            self.complete(Category::Mem);
        } else if prefix.starts_with(Category::Disk.prefix()) && !self.is_registered(Category::Disk) {
            let devices: Arc<[String]> = device_names(rest).into();
            debug!(devices = ?devices, "Discovered disk devices.");
            for mode in DiskMode::ALL {
                table.register(mode.prefix(), Decoder::disk(&self.context, devices.clone(), mode));
            }
            self.complete(Category::Disk);
        }

        self.registered_all()
    }

    fn complete(&mut self, category: Category) {
        self.registered.insert(category);
        debug!(%category, "Header discovery complete for category.");
        if self.registered_all() {
            info!("Header discovery complete, all decoders registered.");
        }
    }
}

/// Device columns of a disk header, after its descriptive label. Blank
/// columns (nmon ends some headers with a comma) are not devices.
fn device_names(columns: &str) -> Vec<String> {
    split_first(columns)
        .1
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
