#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        CfsError, Container, FormatConfig, ListFlags, MemDevice, NodeKind, TouchFlags, ROOT_ID,
    };

    fn init_log() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn mem() -> Container<MemDevice> {
        init_log();
        Container::format(MemDevice::new(), &FormatConfig::default()).unwrap()
    }

    #[test]
    fn test_holes_are_reused_in_table_order() {
        let fs = mem();
        for i in 1..=6 {
            assert_eq!(fs.write_file(&format!("/f{}", i), b"x").unwrap(), i);
        }
        fs.remove("/f5", false, None).unwrap();
        fs.remove("/f2", false, None).unwrap();
        assert!(fs.read_node(2).unwrap().deleted);
        assert!(fs.read_node(5).unwrap().deleted);

        assert_eq!(fs.write_file("/a", b"").unwrap(), 2);
        assert_eq!(fs.write_file("/b", b"").unwrap(), 5);
        assert_eq!(fs.write_file("/c", b"").unwrap(), 7);
        assert_eq!(fs.node_count().unwrap(), 8);
    }

    #[test]
    fn test_directories_keep_dot_entries() {
        let fs = mem();
        let d = fs.make_directory("/d").unwrap();
        let e = fs.make_directory("/d/e").unwrap();
        fs.touch("/d/e/f", TouchFlags::empty()).unwrap();
        fs.remove("/d", true, None).unwrap();

        for id in [ROOT_ID, d] {
            let node = fs.read_node(id).unwrap();
            let entries = node.entries().unwrap();
            assert_eq!(entries[0].name, ".");
            assert_eq!(entries[0].node_id, id);
            assert_eq!(entries[1].name, "..");
            assert_eq!(entries[1].node_id, node.parent);
            assert_eq!(node.size() % crate::ENTRY_WIDTH, 0);
        }
        assert!(fs.read_node(e).unwrap().deleted);
    }

    #[test]
    fn test_link_count_semantics() {
        let fs = mem();
        let f = fs.write_file("/f", b"shared").unwrap();
        fs.make_directory("/d").unwrap();
        fs.link("/f", "/d").unwrap();
        fs.link("/f", "/alias").unwrap();
        assert_eq!(fs.stat("/f").unwrap().link_count, 2);
        assert_eq!(fs.lookup("/d/f").unwrap().node_id, f);

        fs.remove("/alias", false, None).unwrap();
        assert_eq!(fs.read_node(f).unwrap().link_count, 1);
        fs.remove("/f", false, None).unwrap();
        let node = fs.read_node(f).unwrap();
        assert!(!node.deleted);
        assert_eq!(node.link_count, 0);
        assert_eq!(fs.read_file("/d/f").unwrap(), b"shared");

        fs.remove("/d/f", false, None).unwrap();
        assert!(fs.read_node(f).unwrap().deleted);
        assert!(matches!(fs.link("/d", "/x"), Err(CfsError::NotAFile(_))));
    }

    #[test]
    fn test_full_directory_leaves_container_untouched() {
        let fs = mem();
        let slots = fs.superblock().entry_limit() - 2;
        for i in 0..slots {
            fs.write_file(&format!("/f{}", i), b"").unwrap();
        }
        let before = fs.device().unwrap().snapshot();

        assert!(matches!(fs.write_file("/late", b"x"), Err(CfsError::DirectoryFull)));
        assert!(matches!(fs.make_directory("/late"), Err(CfsError::DirectoryFull)));
        assert!(matches!(fs.link("/f0", "/late"), Err(CfsError::DirectoryFull)));
        assert_eq!(fs.device().unwrap().snapshot(), before);
    }

    #[test]
    fn test_collisions_and_limits() {
        let fs = mem();
        fs.write_file("/f", b"").unwrap();
        assert!(matches!(fs.write_file("/f", b""), Err(CfsError::AlreadyExists(_))));
        assert!(matches!(fs.make_directory("/f"), Err(CfsError::AlreadyExists(_))));
        assert!(matches!(
            fs.write_file("/big", &[0u8; 1001]),
            Err(CfsError::ContentTooLarge { size: 1001, max: 1000 })
        ));
        assert!(matches!(
            fs.make_directory(&format!("/{}", "n".repeat(51))),
            Err(CfsError::NameTooLong { .. })
        ));
        assert!(matches!(fs.read_file("/"), Err(CfsError::NotAFile(_))));
        assert!(matches!(fs.remove("/", false, None), Ok(())));
        assert!(matches!(fs.lookup("/f"), Err(CfsError::NotFound(_))));
    }

    #[test]
    fn test_recursive_listing_after_moves() {
        let fs = mem();
        fs.make_directory("/b").unwrap();
        fs.make_directory("/a").unwrap();
        fs.write_file("/a/x", b"1").unwrap();
        fs.move_entity("/a/x", "/b").unwrap();
        fs.copy("/b", "/a", true).unwrap();

        let listed: Vec<_> = fs
            .list("/", ListFlags::RECURSIVE)
            .unwrap()
            .map(|e| e.unwrap())
            .map(|e| (e.path, e.stat.kind))
            .collect();
        assert_eq!(
            listed,
            [
                ("a".to_string(), NodeKind::Directory),
                ("a/b".to_string(), NodeKind::Directory),
                ("a/b/x".to_string(), NodeKind::File),
                ("b".to_string(), NodeKind::Directory),
                ("b/x".to_string(), NodeKind::File),
            ]
        );
    }

    #[test]
    fn test_end_to_end_on_host_file() {
        init_log();
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("disk.cfs");

        let mut disk = Container::create(&path, &FormatConfig::default()).unwrap();
        disk.make_directory("/docs").unwrap();
        disk.write_file("/docs/readme", b"hello").unwrap();
        let loc = disk.lookup("/docs/readme").unwrap();
        assert_eq!(loc.kind, NodeKind::File);
        assert_eq!(disk.stat("/docs/readme").unwrap().size, 5);

        let out = tmp.path().join("out");
        let exported = disk.export("/docs", &out).unwrap();
        assert_eq!(exported, out.join("docs"));
        assert_eq!(fs::read(out.join("docs").join("readme")).unwrap(), b"hello");
        disk.close().unwrap();
        assert!(matches!(disk.lookup("/docs"), Err(CfsError::Closed)));

        let disk = Container::open(&path).unwrap();
        assert_eq!(disk.read_file("/docs/readme").unwrap(), b"hello");
        assert_eq!(disk.superblock(), &FormatConfig::default().validate().unwrap());
    }

    #[test]
    fn test_import_export_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tree");
        fs::create_dir_all(tree.join("sub").join("deep")).unwrap();
        fs::write(tree.join("a.txt"), b"alpha").unwrap();
        fs::write(tree.join("sub").join("b.bin"), [0u8, 1, 2, 255]).unwrap();
        fs::write(tree.join("sub").join("deep").join("empty"), b"").unwrap();

        let disk = mem();
        disk.import(&tree, None).unwrap();
        assert_eq!(disk.read_file("/tree/sub/b.bin").unwrap(), [0u8, 1, 2, 255]);

        let out = tmp.path().join("out");
        disk.export("/tree", &out).unwrap();
        let back = out.join("tree");
        assert_eq!(fs::read(back.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(back.join("sub").join("b.bin")).unwrap(), [0u8, 1, 2, 255]);
        assert!(fs::read(back.join("sub").join("deep").join("empty")).unwrap().is_empty());
        let mut names: Vec<_> = fs::read_dir(&back)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["a.txt", "sub"]);
    }

    #[test]
    fn test_hard_link_name_collision() {
        let fs = mem();
        let f = fs.write_file("/f", b"1").unwrap();
        fs.write_file("/g", b"2").unwrap();
        assert!(matches!(fs.create_hard_link(f, ROOT_ID, "g"), Err(CfsError::AlreadyExists(_))));
        assert!(matches!(fs.link("/f", "/g"), Err(CfsError::AlreadyExists(_))));
        assert_eq!(fs.read_node(f).unwrap().link_count, 0);
        assert_eq!(fs.read_file("/g").unwrap(), b"2");
    }

    #[cfg(unix)]
    #[test]
    fn test_import_skips_special_entries() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        fs::write(tree.join("plain"), b"kept").unwrap();
        symlink(tree.join("plain"), tree.join("link")).unwrap();
        symlink(tmp.path().join("missing"), tree.join("dangling")).unwrap();

        let disk = mem();
        disk.import(&tree, None).unwrap();
        let names: Vec<_> = disk
            .list("/tree", ListFlags::empty())
            .unwrap()
            .map(|e| e.unwrap().name)
            .collect();
        assert_eq!(names, ["plain"]);
        assert_eq!(disk.read_file("/tree/plain").unwrap(), b"kept");
    }

    #[test]
    fn test_declined_subdirectory_survives_recursive_remove() {
        let fs = mem();
        fs.make_directory("/top").unwrap();
        fs.write_file("/top/a", b"").unwrap();
        let keep = fs.make_directory("/top/keep").unwrap();
        fs.write_file("/top/keep/x", b"").unwrap();
        fs.write_file("/top/b", b"").unwrap();
        fs.make_directory("/top/gone").unwrap();
        fs.write_file("/top/gone/y", b"").unwrap();

        let mut answer = |q: &str| q != "remove directory `keep`?";
        fs.remove("/top", true, Some(&mut answer)).unwrap();

        let top = fs.read_node(fs.lookup("/top").unwrap().node_id).unwrap();
        let names: Vec<_> = top.entries().unwrap().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, [".", "..", "keep"]);
        assert_eq!(top.size(), 3 * crate::ENTRY_WIDTH);
        assert_eq!(fs.lookup("/top/keep").unwrap().node_id, keep);
        assert!(matches!(fs.lookup("/top/keep/x"), Err(CfsError::NotFound(_))));
        assert!(matches!(fs.lookup("/top/gone"), Err(CfsError::NotFound(_))));
    }

    #[test]
    fn test_export_uses_the_name_it_was_reached_by() {
        let fs = mem();
        fs.write_file("/f", b"body").unwrap();
        fs.link("/f", "/g").unwrap();
        fs.remove("/f", false, None).unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let written = fs.export("/g", tmp.path()).unwrap();
        assert_eq!(written, tmp.path().join("g"));
        assert_eq!(fs::read(tmp.path().join("g")).unwrap(), b"body");
        assert!(!tmp.path().join("f").exists());
    }

    #[test]
    fn test_export_refuses_escaping_entry_names() {
        let fs = mem();
        let f = fs.write_file("/f", b"x").unwrap();
        let mut root = fs.read_node(ROOT_ID).unwrap();
        root.entries_mut()
            .unwrap()
            .push(crate::DirEntry::new(f, "../escaped"));
        fs.write_node(&root).unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let inner = tmp.path().join("inner");
        assert!(matches!(fs.export("/", &inner), Err(CfsError::InvalidContainer(_))));
        assert!(!tmp.path().join("escaped").exists());
    }

    #[test]
    fn test_removed_working_directory_is_kept() {
        let mut fs = mem();
        let d = fs.make_directory("/d").unwrap();
        fs.change_directory("/d").unwrap();
        fs.remove("/", true, None).unwrap();

        let e = fs.make_directory("/e").unwrap();
        assert_ne!(e, d);
        assert_eq!(fs.working_directory().unwrap(), "/d");
        fs.touch("x", TouchFlags::empty()).unwrap();
        assert!(fs.lookup("/d/x").is_ok());
        assert!(matches!(fs.lookup("/e/x"), Err(CfsError::NotFound(_))));
    }
}
