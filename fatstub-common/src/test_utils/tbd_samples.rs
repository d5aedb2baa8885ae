//! Text-based stub files covering each format version.

/// Untagged (v1) stub with two export sections.
pub const TBD_V1_SQLITE: &str = r#"---
archs:           [ armv7, arm64 ]
platform:        ios
install-name:    /usr/lib/libsqlite3.dylib
current-version: 274.8.1
compatibility-version: 9.0
exports:
  - archs:           [ armv7, arm64 ]
    symbols:         [ _sqlite3_close, _sqlite3_open ]
  - archs:           [ arm64 ]
    symbols:         [ _sqlite3_open_v2 ]
...
"#;

/// v2 stub re-exporting a library, with underscore prefixed Objective-C names.
pub const TBD_V2_FOUNDATION: &str = r#"--- !tapi-tbd-v2
archs:           [ armv7, armv7s, arm64 ]
uuids:           [ 'armv7: 6A7C2F3C-8B1A-3C5E-9D3E-0F1A2B3C4D5E', 'arm64: 1A2B3C4D-5E6F-7A8B-9C0D-1E2F3A4B5C6D' ]
platform:        ios
install-name:    /System/Library/Frameworks/Foundation.framework/Foundation
current-version: 1349.13
compatibility-version: 300
objc-constraint: none
exports:
  - archs:           [ armv7, armv7s, arm64 ]
    re-exports:      [ /usr/lib/libobjc.A.dylib ]
    symbols:         [ _NSLog, _NSStringFromClass ]
    objc-classes:    [ _NSArray, _NSString ]
    objc-ivars:      [ _NSArray._count ]
  - archs:           [ arm64 ]
    weak-def-symbols: [ _NSWeakOnlyOnArm64 ]
...
"#;

/// v3 stub followed by an inlined library document.
pub const TBD_V3_LIBOBJC: &str = r#"--- !tapi-tbd-v3
archs:           [ x86_64, arm64e ]
platform:        macosx
install-name:    '/usr/lib/libobjc.A.dylib'
current-version: 228
compatibility-version: 1
swift-abi-version: 5
exports:
  - archs:           [ x86_64, arm64e ]
    symbols:         [ _objc_msgSend, _objc_retain ]
    objc-classes:    [ NSObject, Protocol ]
    objc-eh-types:   [ NSException ]
  - archs:           [ arm64e ]
    thread-local-symbols: [ _objc_tls_arm64e ]
undefineds:
  - archs:           [ x86_64, arm64e ]
    symbols:         [ __objc_empty_cache ]
--- !tapi-tbd-v3
archs:           [ x86_64, arm64e ]
platform:        macosx
install-name:    '/usr/lib/system/libdyld.dylib'
current-version: 832.7.3
parent-umbrella: System
exports:
  - archs:           [ x86_64, arm64e ]
    symbols:         [ _dlopen, _dlsym ]
...
"#;

/// v4 stub using targets, re-exported libraries and re-exported symbols.
pub const TBD_V4_APPKIT: &str = r#"--- !tapi-tbd
tbd-version:     4
targets:         [ x86_64-macos, arm64-macos, arm64e-macos ]
uuids:
  - target:          x86_64-macos
    value:           3C2D1E0F-4A5B-6C7D-8E9F-0A1B2C3D4E5F
install-name:    '/System/Library/Frameworks/AppKit.framework/Versions/C/AppKit'
current-version: 2022.50.114
compatibility-version: 45
parent-umbrella:
  - targets:         [ x86_64-macos, arm64-macos, arm64e-macos ]
    umbrella:        Cocoa
allowable-clients:
  - targets:         [ x86_64-macos, arm64-macos, arm64e-macos ]
    clients:         [ UIKitMacHelper ]
reexported-libraries:
  - targets:         [ x86_64-macos, arm64-macos, arm64e-macos ]
    libraries:       [ '/System/Library/PrivateFrameworks/UIFoundation.framework/Versions/A/UIFoundation' ]
exports:
  - targets:         [ x86_64-macos, arm64-macos, arm64e-macos ]
    symbols:         [ _NSApp, _NSApplicationMain ]
    objc-classes:    [ NSApplication, NSView, NSWindow ]
    objc-ivars:      [ NSView._frame ]
  - targets:         [ x86_64-macos ]
    symbols:         [ _NSLegacyX86Only ]
reexports:
  - targets:         [ arm64-macos, arm64e-macos ]
    symbols:         [ _NSReexportedOnArm ]
...
"#;
