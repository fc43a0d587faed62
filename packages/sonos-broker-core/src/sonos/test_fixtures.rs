//! Shared test fixtures for device documents and GENA notification payloads.
//!
//! These constants are used by multiple test modules to avoid duplication.
//! Notification bodies carry their embedded documents escaped exactly once,
//! and DIDL inside `val` attributes escaped a second time, as devices send them.

/// `/status/zp` document of the Kitchen player.
pub const STATUS_ZP_KITCHEN: &str = r#"<?xml version="1.0" ?>
<ZPSupportInfo>
  <ZPInfo>
    <ZoneName>Kitchen</ZoneName>
    <ZoneIcon>x-rincon-roomicon:kitchen</ZoneIcon>
    <Configuration>1</Configuration>
    <LocalUID>RINCON_000E58A1B2C301400</LocalUID>
    <SerialNumber>00-0E-58-A1-B2-C3:5</SerialNumber>
    <SoftwareVersion>57.3-77280</SoftwareVersion>
    <HardwareVersion>1.20.1.6-2</HardwareVersion>
    <MACAddress>00:0E:58:A1:B2:C3</MACAddress>
  </ZPInfo>
</ZPSupportInfo>"#;

/// RenderingControl NOTIFY: master volume 37 (stereo pair reports LF/RF at 100),
/// muted, bass -2, treble 3, loudness on.
pub const RENDERING_CONTROL_NOTIFY: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/RCS/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;Volume channel=&quot;Master&quot; val=&quot;37&quot;/&gt;&lt;Volume channel=&quot;LF&quot; val=&quot;100&quot;/&gt;&lt;Volume channel=&quot;RF&quot; val=&quot;100&quot;/&gt;&lt;Mute channel=&quot;Master&quot; val=&quot;1&quot;/&gt;&lt;Mute channel=&quot;LF&quot; val=&quot;0&quot;/&gt;&lt;Mute channel=&quot;RF&quot; val=&quot;0&quot;/&gt;&lt;Bass val=&quot;-2&quot;/&gt;&lt;Treble val=&quot;3&quot;/&gt;&lt;Loudness channel=&quot;Master&quot; val=&quot;1&quot;/&gt;&lt;OutputFixed val=&quot;0&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

/// RenderingControl NOTIFY whose embedded document is truncated.
pub const RENDERING_CONTROL_NOTIFY_MALFORMED: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;Volume channel=&quot;Master&quot; val=&quot;90&quot;/&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

/// AVTransport NOTIFY: playing track 3 of the queue with DIDL metadata.
pub const AV_TRANSPORT_NOTIFY_PLAYING: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/AVT/&quot; xmlns:r=&quot;urn:schemas-rinconnetworks-com:metadata-1-0/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;TransportState val=&quot;PLAYING&quot;/&gt;&lt;CurrentPlayMode val=&quot;SHUFFLE&quot;/&gt;&lt;NumberOfTracks val=&quot;12&quot;/&gt;&lt;CurrentTrack val=&quot;3&quot;/&gt;&lt;CurrentTrackURI val=&quot;x-file-cifs://nas/music/song.mp3&quot;/&gt;&lt;CurrentTrackDuration val=&quot;0:03:58&quot;/&gt;&lt;CurrentTrackMetaData val=&quot;&amp;lt;DIDL-Lite xmlns:dc=&amp;quot;http://purl.org/dc/elements/1.1/&amp;quot; xmlns:upnp=&amp;quot;urn:schemas-upnp-org:metadata-1-0/upnp/&amp;quot; xmlns:r=&amp;quot;urn:schemas-rinconnetworks-com:metadata-1-0/&amp;quot; xmlns=&amp;quot;urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/&amp;quot;&amp;gt;&amp;lt;item id=&amp;quot;-1&amp;quot; parentID=&amp;quot;-1&amp;quot; restricted=&amp;quot;true&amp;quot;&amp;gt;&amp;lt;res protocolInfo=&amp;quot;x-file-cifs:*:audio/mpeg:*&amp;quot; duration=&amp;quot;0:03:58&amp;quot;&amp;gt;x-file-cifs://nas/music/song.mp3&amp;lt;/res&amp;gt;&amp;lt;upnp:albumArtURI&amp;gt;/getaa?u=x-file-cifs%3a%2f%2fnas%2fmusic%2fsong.mp3&amp;amp;amp;v=1&amp;lt;/upnp:albumArtURI&amp;gt;&amp;lt;dc:title&amp;gt;Black Dog&amp;lt;/dc:title&amp;gt;&amp;lt;upnp:class&amp;gt;object.item.audioItem.musicTrack&amp;lt;/upnp:class&amp;gt;&amp;lt;dc:creator&amp;gt;Led Zeppelin&amp;lt;/dc:creator&amp;gt;&amp;lt;upnp:album&amp;gt;IV&amp;lt;/upnp:album&amp;gt;&amp;lt;/item&amp;gt;&amp;lt;/DIDL-Lite&amp;gt;&quot;/&gt;&lt;r:EnqueuedTransportURIMetaData val=&quot;&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

/// AVTransport NOTIFY: paused internet radio with station and show metadata.
pub const AV_TRANSPORT_NOTIFY_RADIO: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/AVT/&quot; xmlns:r=&quot;urn:schemas-rinconnetworks-com:metadata-1-0/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;TransportState val=&quot;PAUSED_PLAYBACK&quot;/&gt;&lt;CurrentPlayMode val=&quot;NORMAL&quot;/&gt;&lt;NumberOfTracks val=&quot;12&quot;/&gt;&lt;CurrentTrack val=&quot;1&quot;/&gt;&lt;CurrentTrackURI val=&quot;x-rincon-mp3radio://radio.example/live&quot;/&gt;&lt;CurrentTrackDuration val=&quot;0:00:00&quot;/&gt;&lt;CurrentTrackMetaData val=&quot;&amp;lt;DIDL-Lite xmlns:dc=&amp;quot;http://purl.org/dc/elements/1.1/&amp;quot; xmlns:upnp=&amp;quot;urn:schemas-upnp-org:metadata-1-0/upnp/&amp;quot; xmlns:r=&amp;quot;urn:schemas-rinconnetworks-com:metadata-1-0/&amp;quot; xmlns=&amp;quot;urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/&amp;quot;&amp;gt;&amp;lt;item id=&amp;quot;-1&amp;quot; parentID=&amp;quot;-1&amp;quot; restricted=&amp;quot;true&amp;quot;&amp;gt;&amp;lt;res protocolInfo=&amp;quot;x-rincon-mp3radio:*:*:*&amp;quot;&amp;gt;x-rincon-mp3radio://radio.example/live&amp;lt;/res&amp;gt;&amp;lt;r:streamContent&amp;gt;Daft Punk - Around the World&amp;lt;/r:streamContent&amp;gt;&amp;lt;r:radioShowMd&amp;gt;Night Shift,p42&amp;lt;/r:radioShowMd&amp;gt;&amp;lt;dc:title&amp;gt;live&amp;lt;/dc:title&amp;gt;&amp;lt;upnp:class&amp;gt;object.item&amp;lt;/upnp:class&amp;gt;&amp;lt;/item&amp;gt;&amp;lt;/DIDL-Lite&amp;gt;&quot;/&gt;&lt;r:EnqueuedTransportURIMetaData val=&quot;&amp;lt;DIDL-Lite xmlns:dc=&amp;quot;http://purl.org/dc/elements/1.1/&amp;quot; xmlns:upnp=&amp;quot;urn:schemas-upnp-org:metadata-1-0/upnp/&amp;quot; xmlns:r=&amp;quot;urn:schemas-rinconnetworks-com:metadata-1-0/&amp;quot; xmlns=&amp;quot;urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/&amp;quot;&amp;gt;&amp;lt;item id=&amp;quot;R:0/0/0&amp;quot; parentID=&amp;quot;R:0/0&amp;quot; restricted=&amp;quot;true&amp;quot;&amp;gt;&amp;lt;dc:title&amp;gt;Radio FM&amp;lt;/dc:title&amp;gt;&amp;lt;upnp:class&amp;gt;object.item.audioItem.audioBroadcast&amp;lt;/upnp:class&amp;gt;&amp;lt;/item&amp;gt;&amp;lt;/DIDL-Lite&amp;gt;&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

/// ZoneGroupTopology NOTIFY: Kitchen coordinates Office, Bedroom alone,
/// plus a zone bridge.
pub const ZONE_GROUP_TOPOLOGY_NOTIFY: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <ZoneGroupState>&lt;ZoneGroupState&gt;&lt;ZoneGroups&gt;&lt;ZoneGroup Coordinator=&quot;RINCON_AAA01400&quot; ID=&quot;RINCON_AAA01400:10&quot;&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_AAA01400&quot; Location=&quot;http://192.168.1.10:1400/xml/device_description.xml&quot; ZoneName=&quot;Kitchen&quot;/&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_BBB01400&quot; Location=&quot;http://192.168.1.11:1400/xml/device_description.xml&quot; ZoneName=&quot;Office&quot;/&gt;&lt;/ZoneGroup&gt;&lt;ZoneGroup Coordinator=&quot;RINCON_CCC01400&quot; ID=&quot;RINCON_CCC01400:3&quot;&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_CCC01400&quot; Location=&quot;http://192.168.1.12:1400/xml/device_description.xml&quot; ZoneName=&quot;Bedroom&quot;/&gt;&lt;/ZoneGroup&gt;&lt;ZoneGroup Coordinator=&quot;RINCON_BRIDGE01400&quot; ID=&quot;RINCON_BRIDGE01400:1&quot;&gt;&lt;ZoneGroupMember UUID=&quot;RINCON_BRIDGE01400&quot; Location=&quot;http://192.168.1.2:1400/xml/device_description.xml&quot; ZoneName=&quot;BRIDGE&quot; IsZoneBridge=&quot;1&quot;/&gt;&lt;/ZoneGroup&gt;&lt;/ZoneGroups&gt;&lt;/ZoneGroupState&gt;</ZoneGroupState>
  </e:property>
</e:propertyset>"#;

/// AlarmClock NOTIFY announcing a new alarm list version.
pub const ALARM_CLOCK_NOTIFY: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <AlarmListVersion>RINCON_AAA01400:42</AlarmListVersion>
  </e:property>
</e:propertyset>"#;

/// `ListAlarms` SOAP response with one alarm for RINCON_AAA01400.
pub const LIST_ALARMS_RESPONSE: &str = r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:ListAlarmsResponse xmlns:u="urn:schemas-upnp-org:service:AlarmClock:1"><CurrentAlarmList>&lt;Alarms&gt;&lt;Alarm ID=&quot;14&quot; StartTime=&quot;07:00:00&quot; Duration=&quot;02:00:00&quot; Recurrence=&quot;WEEKDAYS&quot; Enabled=&quot;1&quot; RoomUUID=&quot;RINCON_AAA01400&quot; ProgramURI=&quot;x-rincon-buzzer:0&quot; ProgramMetaData=&quot;&quot; PlayMode=&quot;SHUFFLE_NOREPEAT&quot; Volume=&quot;25&quot; IncludeLinkedZones=&quot;0&quot;/&gt;&lt;/Alarms&gt;</CurrentAlarmList><CurrentAlarmListVersion>RINCON_AAA01400:42</CurrentAlarmListVersion></u:ListAlarmsResponse></s:Body></s:Envelope>"#;

/// SSDP M-SEARCH response from a Play:5.
pub const SSDP_RESPONSE_PLAY5: &str = "HTTP/1.1 200 OK\r\n\
CACHE-CONTROL: max-age = 1800\r\n\
EXT:\r\n\
LOCATION: http://192.168.1.10:1400/xml/device_description.xml\r\n\
SERVER: Linux UPnP/1.0 Sonos/22.0-65180 (ZPS5)\r\n\
ST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
USN: uuid:RINCON_AAA01400::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
X-RINCON-HOUSEHOLD: Sonos_abc123\r\n\r\n";

/// SSDP M-SEARCH response from a Sonos Bridge.
pub const SSDP_RESPONSE_BRIDGE: &str = "HTTP/1.1 200 OK\r\n\
LOCATION: http://192.168.1.2:1400/xml/device_description.xml\r\n\
SERVER: Linux UPnP/1.0 Sonos/22.0-65180 (BR100)\r\n\
USN: uuid:RINCON_BRIDGE01400::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\r\n";
