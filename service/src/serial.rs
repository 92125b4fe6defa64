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

//! Raw serial port access through termios

use crate::config::{FlowControl, LineSettings, Parity};
use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
use std::time::Duration;
use tracing::debug;

/// How long a read waits for the first byte before reporting `WouldBlock`.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// A serial device configured for raw 8-bit clean transfer.
///
/// Reads wait at most the read timeout for data and then fail with
/// [`io::ErrorKind::WouldBlock`], so a worker polling the port never stalls its other
/// direction for long.
#[derive(Debug)]
pub struct SerialPort {
    file: File,
    device: String,
    read_timeout: Duration,
}

impl SerialPort {
    /// Opens and configures `device`.
    pub fn open(device: &str, line: &LineSettings) -> io::Result<SerialPort> {
        let path = CString::new(device)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid device path"))?;

        let flags = libc::O_RDWR | libc::O_NOCTTY | libc::O_NONBLOCK;
        let fd = unsafe { libc::open(path.as_ptr(), flags) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // Owns the descriptor from here on, closing it on every error path.
        let file = unsafe { File::from_raw_fd(fd) };

        configure(fd, line)?;

        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
            return Err(io::Error::last_os_error());
        }

        debug!(device, line = %line, "serial port configured");
        Ok(SerialPort {
            file,
            device: device.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Changes how long a read waits for data.
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// Device path the port was opened from.
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !wait_readable(self.file.as_raw_fd(), self.read_timeout)? {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl AsRawFd for SerialPort {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Polls `fd` for input. Returns whether data is ready.
pub(crate) fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    poll_fd(fd, libc::POLLIN, timeout)
}

/// Polls `fd` for `events`, retrying on `EINTR`.
pub(crate) fn poll_fd(fd: RawFd, events: libc::c_short, timeout: Duration) -> io::Result<bool> {
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    loop {
        let ret = unsafe { libc::poll(&mut pfd, 1, millis) };
        if ret >= 0 {
            return Ok(ret > 0);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn configure(fd: RawFd, line: &LineSettings) -> io::Result<()> {
    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(io::Error::last_os_error());
    }

    // cfmakeraw equivalent
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::PARODD | libc::CSTOPB | libc::CRTSCTS);
    termios.c_cflag |= libc::CLOCAL | libc::CREAD;

    termios.c_cflag |= match line.data_bits {
        7 => libc::CS7,
        _ => libc::CS8,
    };
    match line.parity {
        Parity::None => {}
        Parity::Even => termios.c_cflag |= libc::PARENB,
        Parity::Odd => termios.c_cflag |= libc::PARENB | libc::PARODD,
    }
    if line.stop_bits == 2 {
        termios.c_cflag |= libc::CSTOPB;
    }
    match line.flow_control {
        FlowControl::None => {}
        FlowControl::XonXoff => termios.c_iflag |= libc::IXON | libc::IXOFF,
        FlowControl::RtsCts => termios.c_cflag |= libc::CRTSCTS,
        FlowControl::Both => {
            termios.c_iflag |= libc::IXON | libc::IXOFF;
            termios.c_cflag |= libc::CRTSCTS;
        }
    }

    let speed = baud_to_speed(line.baud_rate)?;
    unsafe {
        libc::cfsetispeed(&mut termios, speed);
        libc::cfsetospeed(&mut termios, speed);
    }

    // Reads return after 100 ms of silence even with nothing received.
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 1;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Map baud rate u32 to libc speed_t constant.
fn baud_to_speed(baud: u32) -> io::Result<libc::speed_t> {
    match baud {
        300 => Ok(libc::B300),
        600 => Ok(libc::B600),
        1200 => Ok(libc::B1200),
        2400 => Ok(libc::B2400),
        4800 => Ok(libc::B4800),
        9600 => Ok(libc::B9600),
        19200 => Ok(libc::B19200),
        38400 => Ok(libc::B38400),
        57600 => Ok(libc::B57600),
        115200 => Ok(libc::B115200),
        230400 => Ok(libc::B230400),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported baud rate: {baud}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SUPPORTED_BAUD_RATES;

    /// Opens a pseudo terminal and returns the master side plus the slave device path.
    fn open_pty() -> (File, String, File) {
        let mut master: RawFd = -1;
        let mut slave: RawFd = -1;
        let ret = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(ret, 0, "openpty failed");
        let mut name = [0 as libc::c_char; 128];
        assert_eq!(unsafe { libc::ttyname_r(slave, name.as_mut_ptr(), name.len()) }, 0);
        let path = unsafe { std::ffi::CStr::from_ptr(name.as_ptr()) }
            .to_string_lossy()
            .into_owned();
        unsafe { (File::from_raw_fd(master), path, File::from_raw_fd(slave)) }
    }

    #[test]
    fn supported_rates_map_to_speeds() {
        for baud in SUPPORTED_BAUD_RATES {
            assert!(baud_to_speed(baud).is_ok(), "baud {baud} should be supported");
        }
        assert!(baud_to_speed(110).is_err());
    }

    #[test]
    fn invalid_path_fails() {
        let result = SerialPort::open("/dev/nonexistent_serial_port_xyz", &LineSettings::default());
        assert!(result.is_err());
    }

    #[test]
    fn read_times_out_with_would_block() {
        let (_master, path, _slave) = open_pty();
        let mut port = SerialPort::open(&path, &LineSettings::default()).unwrap();
        port.set_read_timeout(Duration::from_millis(5));
        let mut buf = [0u8; 8];
        let err = port.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn raw_bytes_pass_unchanged() {
        let (mut master, path, _slave) = open_pty();
        let mut port = SerialPort::open(&path, &LineSettings::default()).unwrap();
        port.set_read_timeout(Duration::from_secs(2));
        assert_eq!(port.device(), path);

        master.write_all(b"AT\r\x00\xff").unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 16];
        while received.len() < 5 {
            let n = port.read(&mut buf).unwrap();
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, b"AT\r\x00\xff");
    }
}
