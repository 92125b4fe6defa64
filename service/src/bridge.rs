//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::config::Settings;
use crate::context::BridgeContext;
use crate::datalog::DataLog;
use crate::error::{BridgeError, Result};
use crate::metrics::MetricsSnapshot;
use crate::serial::SerialPort;
use crate::serial_worker::SerialWorker;
use crate::telnet_worker::TelnetWorker;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// A running bridge: one serial worker thread and one telnet worker thread sharing a
/// [`BridgeContext`].
///
/// Dropping the bridge stops both workers and waits for them.
pub struct Bridge {
    ctx: Arc<BridgeContext>,
    serial: Option<JoinHandle<Result<()>>>,
    telnet: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Opens the configured serial device and data log, then starts the workers.
    pub fn open(settings: Settings) -> Result<Bridge> {
        settings.validate()?;
        let port = SerialPort::open(&settings.serial_port, &settings.line)?;
        info!(device = %settings.serial_port, line = %settings.line, "serial port opened");

        let data_log = if settings.data_log_enabled {
            let log = DataLog::open(&settings.data_log_file)?;
            info!(path = %settings.data_log_file.display(), "data logging enabled");
            Some(log)
        } else {
            None
        };

        let mut ctx = BridgeContext::new(settings);
        if let Some(log) = data_log {
            ctx = ctx.with_data_log(log);
        }
        Bridge::start(Arc::new(ctx), port)
    }

    /// Starts the workers over an already open serial `port`.
    pub fn start<S>(ctx: Arc<BridgeContext>, port: S) -> Result<Bridge>
    where
        S: Read + Write + Send + 'static,
    {
        let serial_worker = SerialWorker::new(ctx.clone(), port);
        let telnet_worker = TelnetWorker::new(ctx.clone());

        let serial = thread::Builder::new()
            .name("serial_worker".to_string())
            .spawn(move || serial_worker.run())?;
        let telnet = match thread::Builder::new()
            .name("telnet_worker".to_string())
            .spawn(move || telnet_worker.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                ctx.stop();
                let _ = serial.join();
                return Err(err.into());
            }
        };

        info!(
            telnet_host = %ctx.settings().telnet_host,
            telnet_port = ctx.settings().telnet_port,
            "bridge started"
        );
        Ok(Bridge {
            ctx,
            serial: Some(serial),
            telnet: Some(telnet),
        })
    }

    /// Shared state of the running bridge
    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    /// Whether both workers are still running.
    pub fn is_running(&self) -> bool {
        self.ctx.is_running()
            && self.serial.as_ref().is_some_and(|handle| !handle.is_finished())
            && self.telnet.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stops both workers, waits for them and returns the final counters.
    ///
    /// An error from the serial worker is returned after both have been joined.
    pub fn shutdown(mut self) -> Result<MetricsSnapshot> {
        let result = self.join();
        let snapshot = self.ctx.metrics().snapshot();
        info!(%snapshot, "bridge stopped");
        result.map(|()| snapshot)
    }

    fn join(&mut self) -> Result<()> {
        self.ctx.stop();
        let mut result = Ok(());
        if let Some(handle) = self.serial.take() {
            result = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(BridgeError::WorkerPanicked("serial worker")),
            };
        }
        if let Some(handle) = self.telnet.take()
            && handle.join().is_err()
        {
            warn!("telnet worker panicked");
        }
        result
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            warn!(error = %err, "bridge stopped with error");
        }
    }
}
