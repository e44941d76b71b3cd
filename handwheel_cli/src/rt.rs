//! Real-time scheduling for the main loop (Linux SCHED_FIFO and mlockall).

use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock) {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }

    fn mlock(flags: libc::c_int) -> std::io::Result<()> {
        let rc = unsafe { libc::mlockall(flags) };
        if rc != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
        use libc::{MCL_CURRENT, MCL_FUTURE};
        let result = match lock {
            RtLock::None => return Ok(()),
            RtLock::Current => mlock(MCL_CURRENT),
            // Fall back to resident pages when the future lock is refused.
            RtLock::All => mlock(MCL_CURRENT | MCL_FUTURE).or_else(|_| mlock(MCL_CURRENT)),
        };
        result.map_err(|e| {
            let code = e.raw_os_error();
            if code == Some(libc::EPERM) || code == Some(libc::ENOMEM) {
                eyre::eyre!("{e}; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'")
            } else {
                eyre::eyre!(e)
            }
        })
    }

    fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<()> {
        let (min, max) = unsafe {
            let min = sched_get_priority_min(SCHED_FIFO);
            let max = sched_get_priority_max(SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let param = sched_param {
            sched_priority: prio.unwrap_or(max).clamp(min, max),
        };
        let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            let is_root = unsafe { libc::geteuid() == 0 };
            let err = std::io::Error::last_os_error();
            if is_root {
                return Err(eyre::eyre!(err));
            }
            return Err(eyre::eyre!(
                "{err}; needs CAP_SYS_NICE or root \
                 (sudo setcap cap_sys_nice=ep /path/to/handwheel)"
            ));
        }
        tracing::info!(priority = param.sched_priority, "SCHED_FIFO applied");
        Ok(())
    }

    RT_ONCE.get_or_init(|| {
        match try_apply_mem_lock(lock) {
            Ok(()) => match lock {
                RtLock::None => eprintln!("RT: memory locking disabled (none)"),
                RtLock::Current => eprintln!("RT: memory lock = current"),
                RtLock::All => eprintln!("RT: memory lock = all (current|future)"),
            },
            Err(err) => eprintln!("Warning: mlockall failed: {err}"),
        }
        if let Err(err) = try_apply_fifo_priority(prio) {
            let prio_dbg = prio
                .map(|p| p.to_string())
                .unwrap_or_else(|| "(max)".into());
            eprintln!("Warning: sched_setscheduler(SCHED_FIFO, prio={prio_dbg}) failed: {err}");
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>, _lock: RtLock) {
    if rt {
        eprintln!("Warning: real-time mode is only supported on Linux; ignoring --rt");
    }
}
