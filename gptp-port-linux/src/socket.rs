//! Raw `AF_PACKET` socket primitives for one Ethernet interface.
//!
//! The port engine Non-goals explicitly exclude a UDP/IP transport: frames
//! go out as raw Ethernet carrying `ETHERTYPE_GPTP` directly, following the
//! EtherType addresses the teacher's own socket layer already compiled in.
//! `timestamped_socket`'s safe socket wrapper isn't in the dependency
//! stack here, so this talks to `libc` directly; the multicast groups and
//! `PTP_ETHERTYPE` below are the same values the teacher used.

use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::{AsRawFd, RawFd};

use gptp_port::identity::LinkLayerAddress;

pub const PTP_ETHERTYPE: u16 = gptp_port::messages::ETHERTYPE_GPTP;

/// A bound, joined `AF_PACKET`/`SOCK_RAW` socket on one interface.
pub struct RawEthernetSocket {
    fd: RawFd,
    if_index: libc::c_int,
}

impl RawEthernetSocket {
    pub fn open(interface: &str) -> io::Result<Self> {
        let if_index = interface_index(interface)?;

        // SOCK_RAW with ETH_P_ALL so we can filter PTP_ETHERTYPE frames
        // ourselves and still see link-local multicast correctly.
        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, htons(libc::ETH_P_ALL as u16) as i32) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as u16;
        addr.sll_protocol = htons(PTP_ETHERTYPE);
        addr.sll_ifindex = if_index;

        let bind_result = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as u32,
            )
        };
        if bind_result < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }

        Ok(Self { fd, if_index })
    }

    /// Join a multicast MAC group on this interface (`PACKET_ADD_MEMBERSHIP`).
    pub fn join_multicast(&self, group: LinkLayerAddress) -> io::Result<()> {
        let mut mreq: libc::packet_mreq = unsafe { std::mem::zeroed() };
        mreq.mr_ifindex = self.if_index;
        mreq.mr_type = libc::PACKET_MR_MULTICAST as u16;
        mreq.mr_alen = 6;
        mreq.mr_address[..6].copy_from_slice(&group.0);

        let result = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_PACKET,
                libc::PACKET_ADD_MEMBERSHIP,
                &mreq as *const libc::packet_mreq as *const libc::c_void,
                std::mem::size_of::<libc::packet_mreq>() as u32,
            )
        };
        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, LinkLayerAddress)> {
        let mut from: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        let mut from_len = std::mem::size_of::<libc::sockaddr_ll>() as u32;

        let n = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                &mut from as *mut libc::sockaddr_ll as *mut libc::sockaddr,
                &mut from_len,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut mac = [0u8; 6];
        mac.copy_from_slice(&from.sll_addr[..6]);
        Ok((n as usize, LinkLayerAddress::new(mac)))
    }

    pub fn send(&self, dest: LinkLayerAddress, ether_type: u16, data: &[u8]) -> io::Result<()> {
        let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as u16;
        addr.sll_protocol = htons(ether_type);
        addr.sll_ifindex = self.if_index;
        addr.sll_halen = 6;
        addr.sll_addr[..6].copy_from_slice(&dest.0);

        let n = unsafe {
            libc::sendto(
                self.fd,
                data.as_ptr() as *const libc::c_void,
                data.len(),
                0,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as u32,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn link_up(&self) -> bool {
        let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
        // if_index -> name round trip so we don't have to store the name too.
        let name = match interface_name(self.if_index) {
            Ok(name) => name,
            Err(_) => return false,
        };
        copy_name(&name, &mut req.ifr_name);

        let result = unsafe { libc::ioctl(self.fd, libc::SIOCGIFFLAGS, &mut req) };
        if result < 0 {
            return false;
        }
        let flags = unsafe { req.ifr_ifru.ifru_flags } as libc::c_int;
        flags & libc::IFF_RUNNING != 0
    }
}

impl AsRawFd for RawEthernetSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for RawEthernetSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

fn htons(value: u16) -> u16 {
    value.to_be()
}

fn copy_name(name: &str, dest: &mut [libc::c_char; libc::IFNAMSIZ]) {
    for (slot, byte) in dest.iter_mut().zip(name.bytes().chain(std::iter::repeat(0))) {
        *slot = byte as libc::c_char;
    }
}

pub fn interface_index(name: &str) -> io::Result<libc::c_int> {
    let c_name = std::ffi::CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name has an embedded NUL"))?;
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index as libc::c_int)
}

fn interface_name(index: libc::c_int) -> io::Result<String> {
    let mut buf: [libc::c_char; libc::IFNAMSIZ] = unsafe { MaybeUninit::zeroed().assume_init() };
    let result = unsafe { libc::if_indextoname(index as u32, buf.as_mut_ptr()) };
    if result.is_null() {
        return Err(io::Error::last_os_error());
    }
    let c_str = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    Ok(c_str.to_string_lossy().into_owned())
}

/// The interface's permanent MAC address, used to derive a clock identity
/// when none is configured (`SIOCGIFHWADDR`).
pub fn interface_mac_address(name: &str) -> io::Result<[u8; 6]> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
    copy_name(name, &mut req.ifr_name);

    let result = unsafe { libc::ioctl(fd, libc::SIOCGIFHWADDR, &mut req) };
    unsafe { libc::close(fd) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }

    let sockaddr = unsafe { req.ifr_ifru.ifru_hwaddr };
    let mut mac = [0u8; 6];
    for (dst, src) in mac.iter_mut().zip(sockaddr.sa_data.iter()) {
        *dst = *src as u8;
    }
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_resolves_an_index() {
        assert!(interface_index("lo").unwrap() > 0);
    }
}
